const QUALITY_KEYWORDS: &[&str] = &[
    "high quality",
    "detailed",
    "sharp",
    "professional",
    "4k",
    "hd",
    "masterpiece",
    "best quality",
];

/// (trigger words, keywords appended when any trigger is present)
const CATEGORY_KEYWORDS: &[(&[&str], &[&str])] = &[
    (
        &["person", "face", "portrait", "human"],
        &["realistic", "photorealistic", "skin texture"],
    ),
    (
        &["landscape", "nature", "outdoor"],
        &["natural lighting", "scenic", "atmospheric"],
    ),
    (
        &["art", "painting", "drawing"],
        &["artistic", "creative", "expressive"],
    ),
];

const VARIATIONS: &[&str] = &[
    ", artistic style",
    ", cinematic lighting",
    ", vibrant colors",
    ", soft lighting",
    ", dramatic shadows",
    ", minimalist style",
];

const KEYWORDS_APPENDED: usize = 3;

/// Appends quality keywords to a raw prompt. Pure and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptEnhancer;

impl PromptEnhancer {
    pub fn new() -> Self {
        Self
    }

    /// Full keyword list before truncation: the generic keywords followed by
    /// those of every matched category.
    pub fn candidate_keywords(&self, prompt: &str) -> Vec<&'static str> {
        let lowered = prompt.to_lowercase();
        let mut keywords = QUALITY_KEYWORDS.to_vec();

        for (triggers, extra) in CATEGORY_KEYWORDS {
            if triggers.iter().any(|t| lowered.contains(*t)) {
                keywords.extend_from_slice(extra);
            }
        }
        keywords
    }

    pub fn enhance(&self, prompt: &str) -> String {
        let keywords = self.candidate_keywords(prompt);
        let suffix = keywords[..KEYWORDS_APPENDED.min(keywords.len())].join(", ");
        format!("{}, {}", prompt, suffix)
    }

    /// Appends the `index`-th style suffix; past the end the prompt is unchanged.
    pub fn add_variation(&self, prompt: &str, index: usize) -> String {
        match VARIATIONS.get(index) {
            Some(suffix) => format!("{}{}", prompt, suffix),
            None => prompt.to_string(),
        }
    }

    pub fn variation_count(&self) -> usize {
        VARIATIONS.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_keeps_prompt_as_prefix() {
        let enhancer = PromptEnhancer::new();
        for prompt in ["a cat", "", "A PORTRAIT of a Person", "مرحبا"] {
            let enhanced = enhancer.enhance(prompt);
            assert!(enhanced.starts_with(prompt));
            assert!(enhanced.len() > prompt.len());
        }
    }

    #[test]
    fn test_enhance_appends_first_three_keywords() {
        let enhanced = PromptEnhancer::new().enhance("a beautiful sunset");
        assert_eq!(enhanced, "a beautiful sunset, high quality, detailed, sharp");
    }

    #[test]
    fn test_portrait_keywords_are_candidates() {
        let candidates = PromptEnhancer::new().candidate_keywords("A PORTRAIT in oil");
        assert!(candidates.contains(&"photorealistic"));
        // "portrait" does not contain any art trigger word
        assert!(!candidates.contains(&"artistic"));
    }

    #[test]
    fn test_multiple_categories_keep_table_order() {
        let candidates =
            PromptEnhancer::new().candidate_keywords("painting of a face in nature");
        let tail = &candidates[QUALITY_KEYWORDS.len()..];
        assert_eq!(
            tail,
            &[
                "realistic",
                "photorealistic",
                "skin texture",
                "natural lighting",
                "scenic",
                "atmospheric",
                "artistic",
                "creative",
                "expressive",
            ]
        );
    }

    #[test]
    fn test_no_category_means_generic_only() {
        let candidates = PromptEnhancer::new().candidate_keywords("a red cube");
        assert_eq!(candidates, QUALITY_KEYWORDS.to_vec());
    }

    #[test]
    fn test_add_variation() {
        let enhancer = PromptEnhancer::new();
        assert_eq!(enhancer.add_variation("a cat", 1), "a cat, cinematic lighting");
        assert_eq!(enhancer.add_variation("a cat", 6), "a cat");
        assert_eq!(enhancer.variation_count(), 6);
    }
}
