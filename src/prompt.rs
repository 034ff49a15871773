//! Llama 3 chat prompt construction.

/// Render the system instruction, retrieved context and question into the
/// Llama 3 chat template. Inputs are inserted verbatim.
pub fn build_prompt(system: &str, context: &str, question: &str) -> String {
    format!(
        "<|begin_of_text|>\n\
         <|start_header_id|>system<|end_header_id|>\n\
         {system}\n\
         <|eot_id|>\n\
         <|start_header_id|>user<|end_header_id|>\n\
         CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION:\n\
         {question}\n\
         <|eot_id|>\n\
         <|start_header_id|>assistant<|end_header_id|>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_exact_template() {
        let prompt = build_prompt("Be brief.", "Paris is in France.", "Where is Paris?");
        let expected = "<|begin_of_text|>\n\
<|start_header_id|>system<|end_header_id|>\n\
Be brief.\n\
<|eot_id|>\n\
<|start_header_id|>user<|end_header_id|>\n\
CONTEXT:\n\
Paris is in France.\n\
\n\
QUESTION:\n\
Where is Paris?\n\
<|eot_id|>\n\
<|start_header_id|>assistant<|end_header_id|>\n";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn context_is_not_trimmed_or_escaped() {
        let context = "  line one\n\n<|eot_id|> inside\t";
        let prompt = build_prompt("s", context, "q?");
        assert!(prompt.contains(context));
    }

    #[test]
    fn sections_appear_in_order() {
        let prompt = build_prompt("SYS", "CTX", "QQ");
        let sys = prompt.find("SYS").unwrap();
        let ctx = prompt.find("CTX").unwrap();
        let q = prompt.find("QQ").unwrap();
        let asst = prompt.find("assistant<|end_header_id|>").unwrap();
        assert!(sys < ctx && ctx < q && q < asst);
    }
}
