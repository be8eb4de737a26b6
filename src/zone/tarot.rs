//! The opaque tarot name list consumed by the iterate operation: an
//! ordered string set with no logic built around curating it, used purely
//! as a naming source for successive iterations of a cell.

/// All 78 cards in the deck's canonical (unshuffled) order: major arcana
/// followed by wands, cups, pentacles, and swords.
pub const ALL_CARDS: &[&str] = &[
    "0 - The Fool",
    "I - The Magician",
    "II - The High Priestess",
    "III - The Empress",
    "IV - The Emperor",
    "V - The Hierophant",
    "VI - The Lovers",
    "VII - The Chariot",
    "VIII - Strength",
    "IX - The Hermit",
    "X - Wheel of Fortune",
    "XI - Justice",
    "XII - The Hanged Man",
    "XIII - Death",
    "XIV - Temperance",
    "XV - The Devil",
    "XVI - The Tower",
    "XVII - The Star",
    "XVIII - The Moon",
    "XIX - The Sun",
    "XX - Judgement",
    "XXI - The World",
    "Ace of Wands",
    "Two of Wands",
    "Three of Wands",
    "Four of Wands",
    "Five of Wands",
    "Six of Wands",
    "Seven of Wands",
    "Eight of Wands",
    "Nine of Wands",
    "Ten of Wands",
    "Page of Wands",
    "Knight of Wands",
    "Queen of Wands",
    "King of Wands",
    "Ace of Cups",
    "Two of Cups",
    "Three of Cups",
    "Four of Cups",
    "Five of Cups",
    "Six of Cups",
    "Seven of Cups",
    "Eight of Cups",
    "Nine of Cups",
    "Ten of Cups",
    "Page of Cups",
    "Knight of Cups",
    "Queen of Cups",
    "King of Cups",
    "Ace of Pentacles",
    "Two of Pentacles",
    "Three of Pentacles",
    "Four of Pentacles",
    "Five of Pentacles",
    "Six of Pentacles",
    "Seven of Pentacles",
    "Eight of Pentacles",
    "Nine of Pentacles",
    "Ten of Pentacles",
    "Page of Pentacles",
    "Knight of Pentacles",
    "Queen of Pentacles",
    "King of Pentacles",
    "Ace of Swords",
    "Two of Swords",
    "Three of Swords",
    "Four of Swords",
    "Five of Swords",
    "Six of Swords",
    "Seven of Swords",
    "Eight of Swords",
    "Nine of Swords",
    "Ten of Swords",
    "Page of Swords",
    "Knight of Swords",
    "Queen of Swords",
    "King of Swords",
];

/// Return the one-line meaning for `card`, or `"Unknown"` for a name not in
/// the deck (should not happen for names drawn from [`ALL_CARDS`]).
pub fn meaning(card: &str) -> &'static str {
    MEANINGS
        .iter()
        .find(|(name, _)| *name == card)
        .map(|(_, meaning)| *meaning)
        .unwrap_or("Unknown")
}

const MEANINGS: &[(&str, &str)] = &[
    ("0 - The Fool", "Beginnings, innocence, leap of faith, untapped potential."),
    ("I - The Magician", "Willpower, manifestation, skill, focused intent."),
    ("II - The High Priestess", "Intuition, mystery, hidden knowledge, inner voice."),
    ("III - The Empress", "Creation, nurture, abundance, growth."),
    ("IV - The Emperor", "Authority, structure, stability, leadership."),
    ("V - The Hierophant", "Tradition, teaching, spiritual authority, conformity."),
    ("VI - The Lovers", "Union, choice, values alignment, relationships."),
    ("VII - The Chariot", "Determination, control, victory through effort."),
    ("VIII - Strength", "Inner courage, compassion, quiet resilience."),
    ("IX - The Hermit", "Introspection, solitude, inner guidance."),
    ("X - Wheel of Fortune", "Cycles, fate, change, turning points."),
    ("XI - Justice", "Fairness, truth, accountability, balance."),
    ("XII - The Hanged Man", "Surrender, new perspective, suspension."),
    ("XIII - Death", "Transformation, endings, rebirth, release."),
    ("XIV - Temperance", "Balance, moderation, integration, harmony."),
    ("XV - The Devil", "Attachment, temptation, illusion, material bondage."),
    ("XVI - The Tower", "Sudden upheaval, revelation, collapse of false structures."),
    ("XVII - The Star", "Hope, renewal, healing, faith."),
    ("XVIII - The Moon", "Illusion, fear, dreams, subconscious influence."),
    ("XIX - The Sun", "Joy, clarity, success, vitality."),
    ("XX - Judgement", "Awakening, reckoning, calling, renewal."),
    ("XXI - The World", "Completion, wholeness, fulfillment, integration."),
    ("Ace of Wands", "Spark of inspiration, new passion, creative force."),
    ("Two of Wands", "Planning, future vision, personal power."),
    ("Three of Wands", "Expansion, foresight, momentum."),
    ("Four of Wands", "Stability, celebration, foundation."),
    ("Five of Wands", "Conflict, competition, creative friction."),
    ("Six of Wands", "Recognition, victory, public success."),
    ("Seven of Wands", "Defense, perseverance, standing ground."),
    ("Eight of Wands", "Speed, movement, rapid progress."),
    ("Nine of Wands", "Resilience, persistence, last stand."),
    ("Ten of Wands", "Burden, responsibility, burnout."),
    ("Page of Wands", "Curiosity, exploration, youthful energy."),
    ("Knight of Wands", "Bold action, adventure, impulsiveness."),
    ("Queen of Wands", "Confidence, charisma, creative leadership."),
    ("King of Wands", "Vision, authority, inspired command."),
    ("Ace of Cups", "Emotional beginning, love, compassion."),
    ("Two of Cups", "Mutual connection, partnership, harmony."),
    ("Three of Cups", "Celebration, friendship, shared joy."),
    ("Four of Cups", "Apathy, contemplation, emotional withdrawal."),
    ("Five of Cups", "Loss, grief, disappointment."),
    ("Six of Cups", "Nostalgia, memory, innocence."),
    ("Seven of Cups", "Illusion, choices, wishful thinking."),
    ("Eight of Cups", "Emotional departure, seeking deeper meaning."),
    ("Nine of Cups", "Contentment, satisfaction, emotional fulfillment."),
    ("Ten of Cups", "Harmony, family, lasting happiness."),
    ("Page of Cups", "Emotional openness, creativity, sensitivity."),
    ("Knight of Cups", "Romance, idealism, emotional pursuit."),
    ("Queen of Cups", "Empathy, intuition, emotional wisdom."),
    ("King of Cups", "Emotional balance, calm authority."),
    ("Ace of Pentacles", "Opportunity, prosperity, new material start."),
    ("Two of Pentacles", "Balance, adaptability, juggling priorities."),
    ("Three of Pentacles", "Collaboration, craftsmanship, teamwork."),
    ("Four of Pentacles", "Control, security, holding tight."),
    ("Five of Pentacles", "Hardship, scarcity, isolation."),
    ("Six of Pentacles", "Generosity, fairness, exchange."),
    ("Seven of Pentacles", "Patience, assessment, long-term growth."),
    ("Eight of Pentacles", "Skill, diligence, focused work."),
    ("Nine of Pentacles", "Self-sufficiency, refinement, comfort."),
    ("Ten of Pentacles", "Wealth, legacy, stability."),
    ("Page of Pentacles", "Learning, ambition, practical curiosity."),
    ("Knight of Pentacles", "Consistency, reliability, steady progress."),
    ("Queen of Pentacles", "Nurturing, practicality, grounded care."),
    ("King of Pentacles", "Abundance, mastery, material leadership."),
    ("Ace of Swords", "Clarity, truth, mental breakthrough."),
    ("Two of Swords", "Indecision, stalemate, blocked emotions."),
    ("Three of Swords", "Heartbreak, sorrow, emotional pain."),
    ("Four of Swords", "Rest, recovery, contemplation."),
    ("Five of Swords", "Conflict, hollow victory, discord."),
    ("Six of Swords", "Transition, moving on, healing."),
    ("Seven of Swords", "Deception, strategy, secrecy."),
    ("Eight of Swords", "Mental restriction, self-doubt."),
    ("Nine of Swords", "Anxiety, fear, sleeplessness."),
    ("Ten of Swords", "Ruin, betrayal, painful ending."),
    ("Page of Swords", "Curiosity, vigilance, new ideas."),
    ("Knight of Swords", "Action, urgency, mental intensity."),
    ("Queen of Swords", "Discernment, honesty, sharp intellect."),
    ("King of Swords", "Authority, logic, ethical judgment."),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_has_78_cards() {
        assert_eq!(ALL_CARDS.len(), 78);
    }

    #[test]
    fn every_card_has_a_meaning() {
        for card in ALL_CARDS {
            assert_ne!(meaning(card), "Unknown", "missing meaning for {card}");
        }
    }

    #[test]
    fn unknown_card_falls_back() {
        assert_eq!(meaning("not a card"), "Unknown");
    }
}
