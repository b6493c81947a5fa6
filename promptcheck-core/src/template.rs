//! Prompt template rendering.

/// The literal marker in a prompt template that test inputs are substituted
/// into.
pub const PLACEHOLDER: &str = "{{input}}";

/// Render a prompt template by substituting every occurrence of
/// [`PLACEHOLDER`] with the given input.
///
/// Substitution is a single pass over the template: if the input itself
/// contains the placeholder token, that occurrence is not re-substituted.
/// No escaping is performed. Empty templates and empty inputs are both
/// legal (the latter removes the placeholder).
///
/// # Example
///
/// ```
/// use promptcheck_core::template::render;
///
/// assert_eq!(render("Answer: {{input}}", "2+2?"), "Answer: 2+2?");
/// assert_eq!(render("no placeholder", "x"), "no placeholder");
/// ```
pub fn render(template: &str, input: &str) -> String {
    template.replace(PLACEHOLDER, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single("Answer: {{input}}", "2+2?", "Answer: 2+2?")]
    #[case::multiple("{{input}} and {{input}}", "x", "x and x")]
    #[case::absent("no marker here", "x", "no marker here")]
    #[case::empty_input("before {{input}} after", "", "before  after")]
    #[case::empty_template("", "anything", "")]
    fn test_render(#[case] template: &str, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(render(template, input), expected);
    }

    #[test]
    fn test_render_single_pass_for_placeholder_in_input() {
        // The substituted text is not rescanned.
        let out = render("x {{input}} y", "{{input}}");
        assert_eq!(out, "x {{input}} y");
    }

    #[test]
    fn test_render_length_delta() {
        let template = "a {{input}} b {{input}} c";
        let input = "hello";
        let occurrences = template.matches(PLACEHOLDER).count();

        let rendered = render(template, input);
        let expected_delta =
            occurrences as isize * (input.len() as isize - PLACEHOLDER.len() as isize);
        assert_eq!(
            rendered.len() as isize - template.len() as isize,
            expected_delta
        );
    }
}
