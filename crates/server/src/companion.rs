//! Reply generation for the companion.
//!
//! Replies are deterministic so the transcript a client sees depends only on
//! what was said and in which mode.

use shared::domain::Mode;

pub struct ReplyContext<'a> {
    pub user_name: &'a str,
    /// User turns already taken in the current mode, not counting this one.
    pub turns_in_mode: u32,
    pub progress: f64,
}

pub trait Responder: Send + Sync {
    fn greeting(&self, mode: &Mode, ctx: &ReplyContext<'_>) -> String;
    fn reply(&self, mode: &Mode, input: &str, ctx: &ReplyContext<'_>) -> String;
}

pub struct ScriptedCompanion;

const FITNESS_PROMPTS: &[&str] = &[
    "What did you have for breakfast?",
    "Did you get any laps in today?",
    "How much water have you had so far?",
    "Anything planned for dinner?",
];

const STORY_BEATS: &[&str] = &[
    "The rain kept tapping on the clubroom window while we talked.",
    "Somewhere down the hall, a door creaked open and nobody came through it.",
    "I slid a notebook across the desk, the last page still blank.",
    "The lights flickered once, and then everything felt very quiet.",
];

impl Responder for ScriptedCompanion {
    fn greeting(&self, mode: &Mode, ctx: &ReplyContext<'_>) -> String {
        if mode.is(Mode::FITNESS) {
            format!(
                "Hey, babe! Let's check in on today. {}",
                FITNESS_PROMPTS[0]
            )
        } else if mode.is(Mode::STORY) {
            format!(
                "Story time, {}! {} Your turn, what happens next?",
                ctx.user_name, STORY_BEATS[0]
            )
        } else if mode.is(Mode::CHAT) {
            "Hey, sweetie! Just you and me now. What's on your mind?".to_string()
        } else {
            format!("Okay, switching to {mode} mode. Talk to me!")
        }
    }

    fn reply(&self, mode: &Mode, input: &str, ctx: &ReplyContext<'_>) -> String {
        let turn = ctx.turns_in_mode as usize;
        if mode.is(Mode::FITNESS) {
            let percent = (ctx.progress * 100.0).round();
            let next = FITNESS_PROMPTS[(turn + 1) % FITNESS_PROMPTS.len()];
            format!("Got it, I logged that. You're at {percent}% of today's goal. {next}")
        } else if mode.is(Mode::STORY) {
            let beat = STORY_BEATS[(turn + 1) % STORY_BEATS.len()];
            format!("\"{}\"... I like that. {beat}", summarize(input))
        } else {
            format!(
                "Mm, \"{}\"? Tell me more, {}.",
                summarize(input),
                ctx.user_name
            )
        }
    }
}

fn summarize(input: &str) -> String {
    const MAX_CHARS: usize = 60;
    let trimmed = input.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(turns_in_mode: u32) -> ReplyContext<'static> {
        ReplyContext {
            user_name: "Joseph",
            turns_in_mode,
            progress: 0.55,
        }
    }

    #[test]
    fn fitness_reply_reports_progress_and_rotates_prompts() {
        let mode = Mode::new("fitness");
        let first = ScriptedCompanion.reply(&mode, "eggs", &ctx(0));
        let second = ScriptedCompanion.reply(&mode, "eggs", &ctx(1));
        assert!(first.contains("55%"), "{first}");
        assert_ne!(first, second);
    }

    #[test]
    fn long_input_is_shortened_in_replies() {
        let input = "a".repeat(200);
        let reply = ScriptedCompanion.reply(&Mode::new("chat"), &input, &ctx(0));
        assert!(reply.contains(&format!("{}...", "a".repeat(60))));
        assert!(!reply.contains(&"a".repeat(61)));
    }

    #[test]
    fn unknown_mode_gets_generic_greeting() {
        let greeting = ScriptedCompanion.greeting(&Mode::new("karaoke"), &ctx(0));
        assert!(greeting.contains("karaoke"));
    }
}
