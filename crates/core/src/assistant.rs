//! Keyword-driven travel assistant.
//!
//! Classifies a chat message into an intent over Korean and English
//! keywords, then composes a canned answer plus product suggestions drawn
//! from the catalog search the caller performed.

use serde::Serialize;

use crate::documents::format_won;
use crate::types::{DbId, Won};

/// Maximum number of products suggested in one reply.
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Price,
    Itinerary,
    Passport,
    Payment,
    Cancellation,
    Contact,
    Greeting,
    Unknown,
}

/// Checked in order; the first intent with a matching keyword wins.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Cancellation, &["취소", "환불", "cancel", "refund"]),
    (Intent::Passport, &["여권", "비자", "passport", "visa"]),
    (Intent::Payment, &["결제", "카드", "입금", "할부", "payment", "pay", "card"]),
    (Intent::Price, &["가격", "요금", "얼마", "비용", "price", "cost", "how much", "cheap"]),
    (Intent::Itinerary, &["일정", "코스", "기항지", "출발", "itinerary", "route", "schedule", "port", "depart"]),
    (Intent::Contact, &["상담", "전화", "연락", "문의", "contact", "call", "agent"]),
    (Intent::Greeting, &["안녕", "hello", "hi", "hey"]),
];

/// Words that carry no search meaning.
const STOP_WORDS: &[&str] = &[
    "크루즈", "여행", "상품", "추천", "알려줘", "알려주세요", "있나요", "있어요", "궁금해요",
    "cruise", "cruises", "trip", "the", "a", "an", "to", "for", "in", "on", "of", "and", "is",
    "are", "what", "which", "show", "me", "please", "i", "want", "any",
];

/// A catalog product the caller found for this message.
#[derive(Debug, Clone, Serialize)]
pub struct ProductHint {
    pub id: DbId,
    pub title: String,
    pub cruise_line: String,
    pub price: Won,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub intent: Intent,
    pub reply: String,
    pub suggestions: Vec<ProductHint>,
}

fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if keyword.is_ascii() && keyword.len() <= 3 {
        // Short English keywords must match a whole word ("hi" vs "ship").
        haystack
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == keyword)
    } else {
        haystack.contains(keyword)
    }
}

/// Classify a message.
pub fn classify(message: &str) -> Intent {
    let lowered = message.to_lowercase();
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_keyword(&lowered, k)))
        .map_or(Intent::Unknown, |(intent, _)| *intent)
}

/// Terms worth searching the catalog for: the message's words minus stop
/// words and intent keywords.
pub fn extract_search_terms(message: &str) -> Vec<String> {
    let lowered = message.to_lowercase();
    let mut terms: Vec<String> = Vec::new();
    for word in lowered.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().count() < 2 || STOP_WORDS.contains(&word) {
            continue;
        }
        let is_keyword = INTENT_KEYWORDS
            .iter()
            .any(|(_, keywords)| keywords.iter().any(|k| contains_keyword(word, k)));
        if is_keyword {
            continue;
        }
        let word = word.to_string();
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// Compose the assistant's reply for a classified message.
pub fn reply_for(intent: Intent, products: &[ProductHint]) -> AssistantReply {
    let suggestions: Vec<ProductHint> = products.iter().take(MAX_SUGGESTIONS).cloned().collect();

    let mut reply = match intent {
        Intent::Price => {
            if let Some(cheapest) = suggestions.iter().min_by_key(|p| p.price) {
                format!(
                    "Prices start from KRW {} per person ({}). Port charges are quoted separately.",
                    format_won(cheapest.price),
                    cheapest.title
                )
            } else {
                "Prices depend on the ship, cabin and departure date. Tell me a destination and I'll look up fares.".to_string()
            }
        }
        Intent::Itinerary => {
            "Each product page lists the full day-by-day itinerary and ports of call.".to_string()
        }
        Intent::Passport => {
            "Your passport must be valid for at least 6 months after departure. After booking you'll receive a secure link to submit passport details for every guest.".to_string()
        }
        Intent::Payment => {
            "We accept credit cards and bank transfer. Your booking is confirmed once payment is completed.".to_string()
        }
        Intent::Cancellation => {
            "Cancellation fees depend on how close to departure you cancel. Please contact your agent to cancel or change a booking.".to_string()
        }
        Intent::Contact => {
            "A travel consultant will be happy to help. Leave your phone number on any product page and we'll call you back.".to_string()
        }
        Intent::Greeting => {
            "Hello! Ask me about cruise prices, itineraries, passports or payments.".to_string()
        }
        Intent::Unknown => {
            "I'm not sure I understood. You can ask about prices, itineraries, passports, payment or cancellation.".to_string()
        }
    };

    if !suggestions.is_empty() && intent != Intent::Price {
        reply.push_str(" Here are some cruises you might like.");
    }

    AssistantReply {
        intent,
        reply,
        suggestions,
    }
}
