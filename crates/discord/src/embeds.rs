use chrono::{DateTime, Utc};
use serde::Serialize;

use tally_core::{ChoiceButton, DisplayPayload, Tone};

use crate::commands::COMMAND_CATALOG;

pub const COLOR_TEAL: u32 = 0x1ABC9C;
pub const COLOR_ORANGE: u32 = 0xE67E22;
pub const COLOR_GREEN: u32 = 0x2ECC71;
pub const COLOR_RED: u32 = 0xE74C3C;

/// Rich message card, mirroring the fields the chat platform renders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

/// Clickable component attached below an embed. For poll messages the
/// `custom_id` carries the choice id verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn primary(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { custom_id: custom_id.into(), label: label.into(), style: ButtonStyle::Primary }
    }
}

pub struct EmbedBuilder {
    title: String,
    description: String,
    color: u32,
    footer: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl EmbedBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            color: COLOR_TEAL,
            footer: None,
            timestamp: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Embed {
        Embed {
            title: self.title,
            description: self.description,
            color: self.color,
            footer: self.footer,
            timestamp: self.timestamp,
        }
    }
}

/// Maps an engine-rendered frame onto an embed. Tone decides the color; the
/// finished banner also gets a timestamp, matching the closing card.
pub fn embed_from_payload(payload: DisplayPayload) -> Embed {
    let color = match payload.tone {
        Tone::Live | Tone::Results => COLOR_TEAL,
        Tone::Finished => COLOR_RED,
    };
    let mut builder =
        EmbedBuilder::new(payload.title).description(payload.body).color(color);
    if let Some(footer) = payload.footer {
        builder = builder.footer(footer);
    }
    if payload.tone == Tone::Finished {
        builder = builder.timestamp(Utc::now());
    }
    builder.build()
}

pub fn buttons_from_affordances(affordances: &[ChoiceButton]) -> Vec<Button> {
    affordances
        .iter()
        .map(|affordance| Button::primary(affordance.choice_id.to_string(), &affordance.label))
        .collect()
}

pub fn purge_start_embed() -> Embed {
    EmbedBuilder::new("🧹 Clearing Messages")
        .description("Starting to delete messages...")
        .color(COLOR_ORANGE)
        .build()
}

pub fn purge_progress_embed(deleted: usize) -> Embed {
    EmbedBuilder::new("🧹 Clearing Messages")
        .description(format!("Deleted **{deleted}** messages..."))
        .color(COLOR_ORANGE)
        .build()
}

pub fn purge_complete_embed(deleted: usize) -> Embed {
    EmbedBuilder::new("✅ Deletion Complete")
        .description(format!("Cleared **{deleted}** messages 🧹"))
        .color(COLOR_GREEN)
        .build()
}

pub fn purge_error_embed(detail: &str) -> Embed {
    EmbedBuilder::new("❌ Error")
        .description(format!("Failed while deleting messages:\n{detail}"))
        .color(COLOR_RED)
        .build()
}

pub fn help_text() -> String {
    let mut text = "🤖 **Available Commands:**\n".to_owned();
    for (name, description) in COMMAND_CATALOG {
        text.push_str(&format!("`/{name}` - {description}\n"));
    }
    text
}

#[cfg(test)]
mod tests {
    use tally_core::{DisplayPayload, Tone};

    use super::{
        buttons_from_affordances, embed_from_payload, help_text, purge_complete_embed,
        ButtonStyle, COLOR_RED, COLOR_TEAL,
    };

    fn payload(tone: Tone) -> DisplayPayload {
        DisplayPayload {
            title: "📊 Poll".to_owned(),
            body: "**Q**".to_owned(),
            footer: Some("Poll ends in 1 minute 0 seconds".to_owned()),
            tone,
        }
    }

    #[test]
    fn live_payload_maps_to_teal_with_footer() {
        let embed = embed_from_payload(payload(Tone::Live));
        assert_eq!(embed.color, COLOR_TEAL);
        assert_eq!(embed.footer.as_deref(), Some("Poll ends in 1 minute 0 seconds"));
        assert!(embed.timestamp.is_none());
    }

    #[test]
    fn finished_payload_is_red_and_timestamped() {
        let embed = embed_from_payload(payload(Tone::Finished));
        assert_eq!(embed.color, COLOR_RED);
        assert!(embed.timestamp.is_some());
    }

    #[test]
    fn poll_buttons_carry_choice_ids_as_custom_ids() {
        let choice = tally_core::ChoiceButton {
            choice_id: choice_id(),
            label: "Pizza".to_owned(),
        };
        let buttons = buttons_from_affordances(&[choice.clone()]);
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].custom_id, choice.choice_id.to_string());
        assert_eq!(buttons[0].label, "Pizza");
        assert_eq!(buttons[0].style, ButtonStyle::Primary);
    }

    #[test]
    fn help_lists_every_registered_command() {
        let text = help_text();
        for (name, _) in super::COMMAND_CATALOG {
            assert!(text.contains(&format!("`/{name}`")), "missing /{name}");
        }
    }

    #[test]
    fn purge_complete_mentions_the_count() {
        let embed = purge_complete_embed(42);
        assert!(embed.description.contains("**42**"));
    }

    #[test]
    fn embeds_serialize_without_unset_optional_fields() {
        let embed = super::EmbedBuilder::new("📊 Poll").description("**Q**").build();
        let json = serde_json::to_value(&embed).expect("serialize embed");
        assert_eq!(json["color"], COLOR_TEAL);
        assert!(json.get("footer").is_none());
        assert!(json.get("timestamp").is_none());
    }

    fn choice_id() -> tally_core::ChoiceId {
        tally_core::ChoiceId::generate()
    }
}
