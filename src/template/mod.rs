//! Placeholder expansion for new notes.
//!
//! Rules run in a fixed order, each replacing every match in one pass:
//! `{{date}}`, `{{time}}`, `{{title}}`, then the parametrized
//! `{{date+1d:FORMAT}}` form, then `{{yesterday}}` and `{{tomorrow}}`.
//! Because the bare tokens are consumed first, a plain `{{date}}` never gets
//! the current time of day overlaid on it; only tokens with an offset or a
//! custom format do.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex, RegexBuilder};
use time::macros::format_description;
use time::{Duration, PrimitiveDateTime};

use crate::dates::{shift, Clock, DatePattern, OffsetUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Date,
    Time,
    Title,
    Relative,
    Yesterday,
    Tomorrow,
}

struct SubstitutionRule {
    kind: RuleKind,
    pattern: Regex,
}

/// What `{{date:}}` with a blank format renders as. The reference time has no
/// offset, so none is printed.
const ISO_LOCAL_FORMAT: &str = "YYYY-MM-DDTHH:mm:ss";

static RULES: Lazy<Vec<SubstitutionRule>> = Lazy::new(|| {
    [
        (RuleKind::Date, r"\{\{\s*date\s*\}\}"),
        (RuleKind::Time, r"\{\{\s*time\s*\}\}"),
        (RuleKind::Title, r"\{\{\s*title\s*\}\}"),
        (
            RuleKind::Relative,
            r"\{\{\s*(date|time)\s*(([+-]\d+)([yqmwdhs]))?\s*(:.+?)?\}\}",
        ),
        (RuleKind::Yesterday, r"\{\{\s*yesterday\s*\}\}"),
        (RuleKind::Tomorrow, r"\{\{\s*tomorrow\s*\}\}"),
    ]
    .into_iter()
    .map(|(kind, source)| SubstitutionRule {
        kind,
        pattern: RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .expect("valid template rule"),
    })
    .collect()
});

/// Reference date plus the wall-clock time the render happens at.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext {
    pub date: PrimitiveDateTime,
    pub now: PrimitiveDateTime,
}

pub struct TemplateEngine {
    format: DatePattern,
    clock: Arc<dyn Clock>,
}

impl TemplateEngine {
    pub fn new(format: DatePattern, clock: Arc<dyn Clock>) -> Self {
        Self { format, clock }
    }

    pub fn render(&self, body: &str, date: PrimitiveDateTime) -> String {
        let context = TemplateContext {
            date,
            now: self.clock.now(),
        };
        self.render_with(body, &context)
    }

    pub fn render_with(&self, body: &str, context: &TemplateContext) -> String {
        RULES.iter().fold(body.to_string(), |text, rule| {
            self.apply(rule, &text, context)
        })
    }

    fn apply(&self, rule: &SubstitutionRule, text: &str, context: &TemplateContext) -> String {
        let fixed = match rule.kind {
            RuleKind::Date | RuleKind::Title => self.format.format(context.date),
            RuleKind::Time => format_clock(context.now),
            RuleKind::Yesterday => self.format_day_offset(context.date, -1),
            RuleKind::Tomorrow => self.format_day_offset(context.date, 1),
            RuleKind::Relative => {
                return rule
                    .pattern
                    .replace_all(text, |caps: &Captures<'_>| self.relative(caps, context))
                    .into_owned();
            }
        };
        rule.pattern
            .replace_all(text, NoExpand(&fixed))
            .into_owned()
    }

    fn relative(&self, caps: &Captures<'_>, context: &TemplateContext) -> String {
        let mut at = PrimitiveDateTime::new(context.date.date(), context.now.time());
        if let (Some(amount), Some(unit)) = (caps.get(3), caps.get(4)) {
            let delta = amount.as_str().parse::<i64>().ok();
            let unit = unit.as_str().chars().next().and_then(OffsetUnit::from_letter);
            match delta.zip(unit).and_then(|(delta, unit)| shift(at, delta, unit)) {
                Some(shifted) => at = shifted,
                None => tracing::warn!(token = &caps[0], "template offset out of range, ignored"),
            }
        }
        match caps.get(5).map(|custom| custom.as_str()[1..].trim()) {
            Some("") => DatePattern::new(ISO_LOCAL_FORMAT).format(at),
            Some(custom) => DatePattern::new(custom).format(at),
            None => self.format.format(at),
        }
    }

    fn format_day_offset(&self, date: PrimitiveDateTime, days: i64) -> String {
        match date.checked_add(Duration::days(days)) {
            Some(day) => self.format.format(day),
            None => self.format.format(date),
        }
    }
}

fn format_clock(now: PrimitiveDateTime) -> String {
    now.format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| format!("{:02}:{:02}", now.hour(), now.minute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FixedClock;
    use time::macros::datetime;

    fn engine(format: &str) -> TemplateEngine {
        TemplateEngine::new(
            DatePattern::new(format),
            Arc::new(FixedClock(datetime!(2024-05-01 14:30:45))),
        )
    }

    const DAY: PrimitiveDateTime = datetime!(2024-03-10 00:00:00);

    #[test]
    fn bare_tokens_use_the_naming_format() {
        let engine = engine("YYYY-MM-DD");
        assert_eq!(engine.render("{{date}}", DAY), "2024-03-10");
        assert_eq!(engine.render("{{title}}", DAY), "2024-03-10");
        assert_eq!(engine.render("{{time}}", DAY), "14:30");
        assert_eq!(engine.render("{{ DATE }} {{Title}}", DAY), "2024-03-10 2024-03-10");
    }

    #[test]
    fn yesterday_and_tomorrow() {
        let engine = engine("YYYY-MM-DD");
        let rendered = engine.render("Today: {{date}}, Yesterday: {{yesterday}}", DAY);
        insta::assert_snapshot!(rendered, @"Today: 2024-03-10, Yesterday: 2024-03-09");

        let pattern = DatePattern::new("YYYY-MM-DD");
        let before = pattern.parse(&engine.render("{{yesterday}}", DAY), DAY.date()).unwrap();
        let after = pattern.parse(&engine.render("{{tomorrow}}", DAY), DAY.date()).unwrap();
        assert_eq!(before + Duration::days(1), DAY.date());
        assert_eq!(after - Duration::days(1), DAY.date());
    }

    #[test]
    fn offsets_and_custom_formats() {
        let engine = engine("YYYY-MM-DD");
        assert_eq!(engine.render("{{date+1d}}", DAY), "2024-03-11");
        assert_eq!(engine.render("{{date-1w}}", DAY), "2024-03-03");
        assert_eq!(engine.render("{{date:YYYY}}", DAY), "2024");
        assert_eq!(engine.render("{{Date +1M : MMMM}}", DAY), "April");
        assert_eq!(engine.render("{{date+1y:YYYY}}", DAY), "2025");
        assert_eq!(engine.render("{{date-1q:MM}}", DAY), "12");
    }

    #[test]
    fn blank_custom_format_renders_iso_local_time() {
        let engine = engine("DD.MM.YYYY");
        assert_eq!(engine.render("{{date: }}", DAY), "2024-03-10T14:30:45");
        assert_eq!(engine.render("{{date+1d: }}", DAY), "2024-03-11T14:30:45");
    }

    #[test]
    fn parametrized_tokens_carry_the_current_time_of_day() {
        let engine = engine("YYYY-MM-DD");
        assert_eq!(engine.render("{{time:HH:mm:ss}}", DAY), "14:30:45");
        assert_eq!(engine.render("{{time+10h:YYYY-MM-DD HH}}", DAY), "2024-03-11 00");
        assert_eq!(engine.render("{{date-30m:HH:mm}}", DAY), "14:00");
        // the bare token is consumed before the time overlay applies
        assert_eq!(
            engine.render("{{date}} / {{date:YYYY-MM-DD HH:mm}}", DAY),
            "2024-03-10 / 2024-03-10 14:30"
        );
    }

    #[test]
    fn non_placeholders_are_left_alone() {
        let engine = engine("YYYY-MM-DD");
        let body = "{{weather}} costs $1 and {date} stays";
        assert_eq!(engine.render(body, DAY), body);
    }

    #[test]
    fn every_occurrence_is_replaced() {
        let engine = engine("DD.MM.YYYY");
        assert_eq!(
            engine.render("# {{title}}\n[[{{yesterday}}]] | [[{{tomorrow}}]] | {{date}}", DAY),
            "# 10.03.2024\n[[09.03.2024]] | [[11.03.2024]] | 10.03.2024"
        );
    }
}
