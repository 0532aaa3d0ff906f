//! Inline keyboard layouts and their callback payloads.

use nosugar_core::message::Button;

pub const MENU_CHECKIN: &str = "menu_checkin";
pub const MENU_STATS: &str = "menu_stats";
pub const MENU_RECIPES: &str = "menu_recipes";
pub const MENU_NOTES: &str = "menu_notes";
pub const MENU_CHALLENGE: &str = "menu_challenge";
pub const MENU_MOTIVATION: &str = "menu_motivation";
pub const MENU_SWEET_CRAVING: &str = "menu_sweet_craving";
pub const MENU_SLIP_ANALYSIS: &str = "menu_slip_analysis";
pub const MENU_HELP: &str = "menu_help";
pub const MENU_BACK: &str = "menu_back";
pub const CHECKIN_SUCCESS: &str = "checkin_success";
pub const CHECKIN_FAIL: &str = "checkin_fail";
pub const CHALLENGE_COMPLETE: &str = "challenge_complete";
pub const NOTE_CREATE: &str = "note_create";
pub const NOTE_LIST: &str = "note_list";
pub const RECIPE_CREATE: &str = "recipe_create";
pub const RECIPE_LIST: &str = "recipe_list";
pub const SLIP_ANALYSIS: &str = "slip_analysis";

type Keyboard = Vec<Vec<Button>>;

fn back_row() -> Vec<Button> {
    vec![Button::new("🔙 Back", MENU_BACK)]
}

pub fn back() -> Keyboard {
    vec![back_row()]
}

pub fn main_menu() -> Keyboard {
    vec![
        vec![
            Button::new("✅ Check-in", MENU_CHECKIN),
            Button::new("📊 Stats", MENU_STATS),
        ],
        vec![
            Button::new("🍳 Recipes", MENU_RECIPES),
            Button::new("📝 Notes", MENU_NOTES),
        ],
        vec![
            Button::new("🎯 Challenge", MENU_CHALLENGE),
            Button::new("💪 Motivation", MENU_MOTIVATION),
        ],
        vec![
            Button::new("🍭 Want sugar", MENU_SWEET_CRAVING),
            Button::new("📝 Slip analysis", MENU_SLIP_ANALYSIS),
        ],
        vec![Button::new("ℹ️ Help", MENU_HELP)],
    ]
}

/// Yes/no check-in question, also attached to the daily reminder.
pub fn checkin_question() -> Keyboard {
    vec![
        vec![
            Button::new("✅ Stayed clean", CHECKIN_SUCCESS),
            Button::new("❌ Slipped", CHECKIN_FAIL),
        ],
        vec![
            Button::new("🍳 Recipes", MENU_RECIPES),
            Button::new("💪 Motivation", MENU_MOTIVATION),
        ],
        back_row(),
    ]
}

pub fn already_checked_in() -> Keyboard {
    vec![
        vec![
            Button::new("🍳 Recipes", MENU_RECIPES),
            Button::new("💪 Motivation", MENU_MOTIVATION),
        ],
        back_row(),
    ]
}

pub fn stats() -> Keyboard {
    vec![
        vec![
            Button::new("✅ Check-in", MENU_CHECKIN),
            Button::new("🍳 Recipes", MENU_RECIPES),
        ],
        vec![
            Button::new("📝 Notes", MENU_NOTES),
            Button::new("🎯 Challenge", MENU_CHALLENGE),
        ],
        back_row(),
    ]
}

pub fn recipes() -> Keyboard {
    vec![
        vec![
            Button::new("🔍 Find a recipe", RECIPE_CREATE),
            Button::new("📋 My recipes", RECIPE_LIST),
        ],
        back_row(),
    ]
}

pub fn notes() -> Keyboard {
    vec![
        vec![
            Button::new("✏️ New note", NOTE_CREATE),
            Button::new("📋 My notes", NOTE_LIST),
        ],
        back_row(),
    ]
}

/// Challenge view; the "Done" button only while it is still open.
pub fn challenge(open: bool) -> Keyboard {
    let mut rows = Vec::new();
    if open {
        rows.push(vec![Button::new("✅ Done", CHALLENGE_COMPLETE)]);
    }
    rows.push(back_row());
    rows
}

pub fn motivation() -> Keyboard {
    vec![
        vec![
            Button::new("✅ Check-in", MENU_CHECKIN),
            Button::new("🍳 Recipes", MENU_RECIPES),
        ],
        vec![
            Button::new("🍭 Want sugar", MENU_SWEET_CRAVING),
            Button::new("🎯 Challenge", MENU_CHALLENGE),
        ],
        back_row(),
    ]
}

pub fn sweet_craving() -> Keyboard {
    vec![
        vec![
            Button::new("🍳 Find a recipe", RECIPE_CREATE),
            Button::new("💪 Motivation", MENU_MOTIVATION),
        ],
        back_row(),
    ]
}

pub fn slip_analysis() -> Keyboard {
    vec![
        vec![Button::new("📝 Start slip analysis", SLIP_ANALYSIS)],
        vec![
            Button::new("📋 My notes", NOTE_LIST),
            Button::new("💪 Motivation", MENU_MOTIVATION),
        ],
        back_row(),
    ]
}

pub fn help() -> Keyboard {
    let mut rows = main_menu();
    // Drop the help button itself and the craving/slip row.
    rows.truncate(3);
    rows.push(back_row());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(kb: &Keyboard) -> Vec<&str> {
        kb.iter().flatten().map(|b| b.data.as_str()).collect()
    }

    #[test]
    fn test_main_menu_covers_every_section() {
        let menu = main_menu();
        let data = payloads(&menu);
        for expected in [
            MENU_CHECKIN,
            MENU_STATS,
            MENU_RECIPES,
            MENU_NOTES,
            MENU_CHALLENGE,
            MENU_MOTIVATION,
            MENU_SWEET_CRAVING,
            MENU_SLIP_ANALYSIS,
            MENU_HELP,
        ] {
            assert!(data.contains(&expected), "missing {expected}");
        }
        assert!(!data.contains(&MENU_BACK));
    }

    #[test]
    fn test_submenus_lead_back() {
        for kb in [
            back(),
            checkin_question(),
            already_checked_in(),
            stats(),
            recipes(),
            notes(),
            challenge(true),
            challenge(false),
            motivation(),
            sweet_craving(),
            slip_analysis(),
            help(),
        ] {
            assert_eq!(payloads(&kb).last(), Some(&MENU_BACK));
        }
    }

    #[test]
    fn test_challenge_done_button_only_when_open() {
        assert!(payloads(&challenge(true)).contains(&CHALLENGE_COMPLETE));
        assert!(!payloads(&challenge(false)).contains(&CHALLENGE_COMPLETE));
    }

    #[test]
    fn test_help_has_no_help_button() {
        assert!(!payloads(&help()).contains(&MENU_HELP));
    }

    #[test]
    fn test_callback_payloads_fit_telegram_limit() {
        // Telegram caps callback_data at 64 bytes.
        for kb in [main_menu(), checkin_question(), slip_analysis(), notes(), recipes()] {
            assert!(payloads(&kb).iter().all(|d| d.len() <= 64));
        }
    }
}
