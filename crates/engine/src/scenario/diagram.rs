use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::library::{decode_json, ScenarioError, Sequence};
use super::types::Frame;

const DIAGRAM_OPEN: &str = "<diagram>";
const DIAGRAM_CLOSE: &str = "</diagram>";

/// Scenario carried inside a conversational reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub title: String,
    pub description: String,
    pub sequence: Sequence,
}

/// A reply split into its prose and the optional diagram it carried.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    pub diagram: Option<Diagram>,
}

#[derive(Debug, Deserialize)]
struct SequenceDiagram {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    sequence: Vec<Frame>,
}

/// Extracts the first `<diagram>…</diagram>` block from `reply` and strips it
/// from the text. A reply without a closed block is plain text.
pub fn split_reply(reply: &str) -> Result<AssistantReply, ScenarioError> {
    let Some(open) = reply.find(DIAGRAM_OPEN) else {
        return Ok(plain_reply(reply));
    };
    let body_start = open + DIAGRAM_OPEN.len();
    let Some(close_offset) = reply[body_start..].find(DIAGRAM_CLOSE) else {
        debug!(offset = open, "diagram_block_unterminated");
        return Ok(plain_reply(reply));
    };
    let body_end = body_start + close_offset;
    let diagram = parse_diagram(reply[body_start..body_end].trim())?;

    let mut text = String::with_capacity(reply.len());
    text.push_str(&reply[..open]);
    text.push_str(&reply[body_end + DIAGRAM_CLOSE.len()..]);

    Ok(AssistantReply {
        text: text.trim().to_string(),
        diagram: Some(diagram),
    })
}

/// Accepts either `{title, description, sequence: [...]}` or a bare frame.
pub fn parse_diagram(raw: &str) -> Result<Diagram, ScenarioError> {
    let value = decode_json::<Value>(raw)?;
    let has_sequence = value
        .as_object()
        .is_some_and(|object| object.contains_key("sequence"));

    if has_sequence {
        let parsed = decode_json::<SequenceDiagram>(raw)?;
        return Ok(Diagram {
            title: parsed.title,
            description: parsed.description,
            sequence: Sequence::new(parsed.sequence)?,
        });
    }

    let title = string_field(&value, "title");
    let description = string_field(&value, "description");
    let frame = decode_json::<Frame>(raw)?;
    Ok(Diagram {
        title,
        description,
        sequence: Sequence::new(vec![frame])?,
    })
}

fn plain_reply(reply: &str) -> AssistantReply {
    AssistantReply {
        text: reply.to_string(),
        diagram: None,
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_without_diagram_is_plain_text() {
        let reply = split_reply("A rouge scores five points.").expect("reply");
        assert_eq!(reply.text, "A rouge scores five points.");
        assert!(reply.diagram.is_none());
    }

    #[test]
    fn sequence_diagram_is_extracted_and_stripped() {
        let raw = r#"Here is the move.
<diagram>{"title":"Sneak","description":"Fly offside","sequence":[
  {"atk":{"fly":{"x":30,"y":40}},"caption":"start"},
  {"atk":{"fly":{"x":45,"y":40}},"caption":"sneaks","dur":1800}
]}</diagram>
Watch the fly."#;
        let reply = split_reply(raw).expect("reply");
        assert_eq!(reply.text, "Here is the move.\n\nWatch the fly.");
        let diagram = reply.diagram.expect("diagram");
        assert_eq!(diagram.title, "Sneak");
        assert_eq!(diagram.description, "Fly offside");
        assert_eq!(diagram.sequence.len(), 2);
        assert_eq!(
            diagram.sequence.frame(1).map(|frame| frame.caption.as_str()),
            Some("sneaks")
        );
    }

    #[test]
    fn single_frame_diagram_becomes_one_step_sequence() {
        let raw = concat!(
            r#"<diagram>{"title":"Bully","#,
            r#""zones":[{"t":"bully","x":48,"y":30,"w":14,"h":14}]}</diagram>"#
        );
        let diagram = split_reply(raw)
            .expect("reply")
            .diagram
            .expect("diagram");
        assert_eq!(diagram.title, "Bully");
        assert_eq!(diagram.sequence.len(), 1);
        assert_eq!(
            diagram.sequence.frame(0).map(|frame| frame.zones.len()),
            Some(1)
        );
    }

    #[test]
    fn unterminated_block_is_left_in_text() {
        let raw = "Look: <diagram>{\"atk\":{}}";
        let reply = split_reply(raw).expect("reply");
        assert_eq!(reply.text, raw);
        assert!(reply.diagram.is_none());
    }

    #[test]
    fn invalid_diagram_json_is_a_load_error() {
        assert!(matches!(
            split_reply("<diagram>{not json}</diagram>"),
            Err(ScenarioError::Decode { .. })
        ));
        assert!(matches!(
            split_reply(r#"<diagram>{"sequence":[]}</diagram>"#),
            Err(ScenarioError::EmptySequence)
        ));
    }
}
