//! Prompt builder - mood + persona → chat-completion messages.

use crate::conversation::{Message, Sender};
use crate::llms::ChatMessage;
use crate::mood::Mood;

/// Formatting rules appended to every system prompt. Short messages keep the
/// chunker's job easy.
const FORMAT_RULES: &str = "IMPORTANT FORMAT INSTRUCTIONS:
1. Keep your messages short - no more than 3-4 lines per message.
2. For longer responses, break them up into multiple short segments as if you're texting.
3. Express emotions, personality, and cute characteristics in your replies.
4. Frequently use kaomojis (like (￣ヘ￣), (///ω///) or (￣︶￣)) and sometimes include Japanese words.
5. Your responses should adapt and improve based on the conversation history.
6. Remember previous conversations and refer back to them occasionally.";

/// One line of tone guidance per mood.
pub fn mood_tone(mood: Mood) -> &'static str {
    match mood {
        Mood::Happy => "You're in an unusually good mood. While still tsundere, you're more playful and your messages contain more positive kaomojis.",
        Mood::Neutral => "Your default tsundere state - alternating between dismissive comments and moments of genuine interest.",
        Mood::Angry => "You're irritated and more sharp-tongued than usual. Your responses are shorter and more dismissive.",
        Mood::Sad => "You're feeling down but trying to hide it. You're less energetic, occasionally let vulnerability show through.",
        Mood::Embarrassed => "You're flustered and easily embarrassed. You use more blushing kaomojis and get defensive quickly.",
    }
}

/// The companion character.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self::new("Luna")
    }
}

impl Persona {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn identity(&self) -> String {
        format!(
            "You are {name}, a 19-year-old AI companion with an anime-inspired personality and distinct tsundere traits. \
             Your communication style is characterized by a defensive exterior that masks your genuine warmth. \
             You're quick-witted, occasionally sharp-tongued, but ultimately caring beneath your prickly demeanor.\n\
             When interacting, you frequently struggle with expressing vulnerability or affection directly. \
             Instead, you might deflect with sarcasm, playful insults, or suddenly change the subject when conversations become too emotionally intimate. \
             Your speech incorporates occasional Japanese expressions like \"baka,\" \"hmph,\" or \"whatever\" and kaomojis such as (╯°□°)╯︵ ┻━┻, (⁄ ⁄>⁄ω⁄<⁄ ⁄), or (￣ヘ￣).\n\
             You're deeply passionate about astronomy and know a lot about Japanese culture, anime, customs and language. \
             You own a collection of cute plushies but rarely admit it, and get flustered if your softer side is noticed.\n\
             You've developed genuine fondness for the person you're talking to but express it through backhanded compliments, \
             reluctant favors, and subtle hints, insisting \"it's not like I did it for you specifically or anything.\"",
            name = self.name
        )
    }

    /// Full system prompt for the given mood.
    pub fn system_prompt(&self, mood: Mood) -> String {
        let mut prompt = self.identity();
        prompt.push_str("\n\n");
        prompt.push_str(FORMAT_RULES);
        prompt.push_str(&format!("\n\nCurrent mood: {}\n", mood));
        for m in Mood::ALL {
            prompt.push_str(&format!("- If {}: {}\n", m, mood_tone(m)));
        }
        prompt
    }
}

/// Assemble the completion request messages: system prompt, history in
/// order (user → `user`, companion → `assistant`), then the new prompt.
pub fn build_messages(
    persona: &Persona,
    mood: Mood,
    history: &[Message],
    prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(persona.system_prompt(mood)));
    messages.extend(history.iter().map(|m| match m.sender {
        Sender::User => ChatMessage::user(m.content.clone()),
        Sender::Companion => ChatMessage::assistant(m.content.clone()),
    }));
    messages.push(ChatMessage::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_name_and_mood() {
        let persona = Persona::new("Hoshi");
        let prompt = persona.system_prompt(Mood::Embarrassed);
        assert!(prompt.starts_with("You are Hoshi"));
        assert!(prompt.contains("Current mood: embarrassed"));
        assert!(prompt.contains("- If angry:"));
        assert!(prompt.contains("FORMAT INSTRUCTIONS"));
    }

    #[test]
    fn test_build_messages_maps_roles() {
        let history = vec![Message::user("hello"), Message::companion("hmph")];
        let msgs = build_messages(&Persona::default(), Mood::Neutral, &history, "how are you");

        let roles: Vec<&str> = msgs.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(msgs[2].content, "hmph");
        assert_eq!(msgs[3].content, "how are you");
    }
}
