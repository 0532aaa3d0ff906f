//! Canned encouragement, celebration and fallback texts.

use nosugar_core::streak::Milestone;
use rand::seq::SliceRandom;

const SUCCESS_MESSAGES: &[&str] = &[
    "🎉 Great work! You've held on for {} days!",
    "🔥 Incredible! Your willpower is impressive!",
    "💪 Every day without sugar is a win!",
    "🌟 You're getting stronger every day!",
    "🏆 Keep it up! You're doing great!",
    "✨ Your persistence is inspiring!",
    "🎯 One more day towards a healthier life!",
    "💎 You're a real diamond! Keep shining!",
];

const SLIP_UP_MESSAGES: &[&str] = &[
    "😔 Don't worry, everyone slips. What matters is not giving up!",
    "🔄 Tomorrow is a new day with new chances!",
    "💪 One slip doesn't erase all your progress!",
    "🌟 Every setback is a lesson. Learn and move on!",
    "🎯 Remember your goal! You're stronger than you think!",
    "💎 Diamonds aren't polished in a day. Keep working on yourself!",
    "🔥 A small spark can light a big fire of motivation!",
    "✨ Every day is a new chance to get better!",
];

const DAILY_MOTIVATIONS: &[&str] = &[
    "🌅 Good morning! Today is a great day to build your willpower!",
    "☀️ A new day brings new chances! You've got this!",
    "💪 Today you'll be stronger than yesterday!",
    "🎯 Remember your goal: a healthy body and a clear mind!",
    "🌟 You're on the right track! Keep moving!",
    "🔥 Your determination lights a fire in others!",
    "💎 Every sugar-free day makes you more precious!",
    "✨ You're building a better future for yourself!",
];

const WEEKLY_CHALLENGES: &[&str] = &[
    "🎯 A week without sweet drinks\n\nDrink only water, unsweetened tea and coffee all week. Swap soda and juice for healthy alternatives!",
    "🎯 Daily walks\n\nWalk for 30 minutes outdoors every day. It builds health and takes your mind off sweets!",
    "🎯 Fruit week\n\nEat fruit instead of sweets all week. Apples, pears, oranges: natural sweetness without the harm!",
    "🎯 Morning workout\n\nDo 10 squats and 10 push-ups every morning. Physical activity strengthens willpower!",
    "🎯 Water week\n\nDrink 2 liters of water every day. Water cleanses the body and lowers sugar cravings!",
    "🎯 Meditation\n\nPractice 5 minutes of meditation every day. It helps handle stress without sweets!",
    "🎯 Healthy breakfast\n\nCook a wholesome breakfast every day: oatmeal, eggs, cottage cheese. Start the day right!",
];

/// Snacks to suggest when a craving hits.
pub const ALTERNATIVE_SNACKS: &[&str] = &[
    "🍎 Apple with cinnamon",
    "🥜 A handful of nuts (almonds, walnuts)",
    "🥑 Avocado with salt and pepper",
    "🥕 Carrot sticks with hummus",
    "🍓 Strawberries or other berries",
    "🥚 A boiled egg",
    "🧀 A piece of cheese",
    "🥬 Lettuce leaves with olive oil",
    "🌰 Sunflower or pumpkin seeds",
    "🥛 Plain Greek yogurt",
];

fn pick(pool: &'static [&'static str]) -> &'static str {
    pool.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

/// Random praise, with the streak filled in where the phrase asks for it.
pub fn success_message(streak: u32) -> String {
    pick(SUCCESS_MESSAGES).replace("{}", &streak.to_string())
}

pub fn slip_up_message() -> &'static str {
    pick(SLIP_UP_MESSAGES)
}

pub fn daily_motivation() -> &'static str {
    pick(DAILY_MOTIVATIONS)
}

pub fn random_weekly_challenge() -> &'static str {
    pick(WEEKLY_CHALLENGES)
}

pub fn celebration(milestone: Milestone) -> String {
    match milestone {
        Milestone::Week => "🎉 A whole week without sugar! You're a real hero! 🌟".to_string(),
        Milestone::Month => {
            "🏆 A month without sugar! That's an incredible result! 💎".to_string()
        }
        Milestone::Hundred => "👑 100 days! You rule the kingdom of willpower! 👑".to_string(),
        Milestone::Weeks(weeks) => format!(
            "🎊 {} days! You get stronger every week! 💪",
            weeks * 7
        ),
    }
}

/// Penalty reminder after a slip-up.
pub fn payment_reminder(card: &str) -> String {
    format!(
        "💸 Oops! Looks like you slipped! 😅\n\n\
         By our rules, send 50 som to this card:\n\
         💳 {card}\n\n\
         It'll help you keep yourself in check next time! 😉"
    )
}

pub fn alternatives_list() -> String {
    ALTERNATIVE_SNACKS.join("\n")
}

/// Recipe used when the text generator is unavailable.
pub fn fallback_recipe(ingredients: &str) -> String {
    format!(
        "🍳 Healthy salad\n\n\
         ⏰ Cooking time: 15 minutes\n\n\
         🥗 Ingredients:\n\
         - {ingredients}\n\
         - Olive oil\n\
         - Lemon juice\n\
         - Salt and pepper to taste\n\n\
         👨‍🍳 Steps:\n\
         1. Chop all the ingredients\n\
         2. Mix them in a large bowl\n\
         3. Add olive oil and lemon juice\n\
         4. Season with salt and pepper\n\
         5. Toss gently\n\n\
         💡 Tip: this salad is rich in vitamins and fiber, so it curbs hunger without harming your health!"
    )
}

/// Motivation used when the text generator is unavailable, tiered by streak.
pub fn fallback_motivation(streak: u32) -> String {
    match streak {
        0 => "💪 Every day is a new chance to start a healthy life! You can do it!".to_string(),
        1..=6 => format!(
            "🔥 Great start! {streak} days without sugar is real progress! Keep it up!"
        ),
        7..=29 => format!(
            "🌟 Amazing! {streak} days of healthy eating! You're building good habits!"
        ),
        _ => format!(
            "🏆 Stunning! {streak} days without sugar! You're a true healthy-living hero!"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_message_fills_streak() {
        for _ in 0..50 {
            let msg = success_message(12);
            assert!(!msg.contains("{}"));
            assert!(SUCCESS_MESSAGES
                .iter()
                .any(|p| p.replace("{}", "12") == msg));
        }
    }

    #[test]
    fn test_pools_are_used() {
        assert!(SLIP_UP_MESSAGES.contains(&slip_up_message()));
        assert!(DAILY_MOTIVATIONS.contains(&daily_motivation()));
        assert!(WEEKLY_CHALLENGES.contains(&random_weekly_challenge()));
    }

    #[test]
    fn test_celebrations() {
        assert!(celebration(Milestone::Week).contains("week"));
        assert!(celebration(Milestone::Month).contains("month"));
        assert!(celebration(Milestone::Hundred).contains("100"));
        assert!(celebration(Milestone::Weeks(3)).contains("21 days"));
    }

    #[test]
    fn test_payment_reminder_includes_card() {
        assert!(payment_reminder("4169 0000 1111 2222").contains("4169 0000 1111 2222"));
    }

    #[test]
    fn test_fallback_recipe_embeds_ingredients() {
        assert!(fallback_recipe("eggs, spinach").contains("- eggs, spinach"));
    }

    #[test]
    fn test_fallback_motivation_tiers() {
        assert!(fallback_motivation(0).contains("new chance"));
        assert!(fallback_motivation(3).contains("Great start! 3 days"));
        assert!(fallback_motivation(7).contains("Amazing! 7 days"));
        assert!(fallback_motivation(29).contains("Amazing! 29 days"));
        assert!(fallback_motivation(30).contains("Stunning! 30 days"));
    }

    #[test]
    fn test_alternatives_list() {
        let list = alternatives_list();
        assert_eq!(list.lines().count(), ALTERNATIVE_SNACKS.len());
    }
}
