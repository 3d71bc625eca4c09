/// Rough upper bound, in characters, for one answer segment.
pub const SEGMENT_CHARS: usize = 120;

/// Upper bound on the number of segments the model is asked to produce.
pub const MAX_SEGMENTS: usize = 5;

/// Wrap a user question in the instructions sent to the model.
pub fn render(question: &str) -> String {
    format!(
        "You are an expert and helpful assistant. Answer the following question clearly, \
concisely and professionally. If the question is about a study topic, give detailed but \
understandable explanations. Do not write formulas in markdown. If the answer is too long, \
split it into several messages of at most {SEGMENT_CHARS} characters each. If you do split it, \
do not make the messages excessively short, and try not to send more than {MAX_SEGMENTS} \
messages in total. If one message is enough, send only one.\n\
The main topic of the questions is General Topology, but you must answer everything anyway.\n\n\
Reply with a JSON object of the form {{\"messages\": [\"...\"]}}.\n\n\
Question: {question}\n\n\
Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_is_embedded_once_at_the_end() {
        let prompt = render("What is a compact space?");
        assert_eq!(prompt.matches("What is a compact space?").count(), 1);
        assert!(prompt.ends_with("Question: What is a compact space?\n\nAnswer:"));
    }

    #[test]
    fn prompt_states_the_limits() {
        let prompt = render("x");
        assert!(prompt.contains("at most 120 characters"));
        assert!(prompt.contains("more than 5 messages"));
        assert!(prompt.contains("General Topology"));
        assert!(prompt.contains(r#"{"messages": ["..."]}"#));
    }

    #[test]
    fn braces_in_the_question_survive() {
        assert!(render("is {x} open?").contains("Question: is {x} open?"));
    }
}
