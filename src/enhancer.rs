use std::sync::Arc;

use tracing::{info, warn};

use crate::provider::ChatProvider;

pub struct PromptEnhancer {
    chat: Arc<dyn ChatProvider>,
}

impl PromptEnhancer {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    fn build_instruction(prompt: &str) -> String {
        format!(
            "You are an expert prompt engineer for AI image generation. \
            Rewrite the following prompt into a single richer, more descriptive prompt: \
            add concrete details about style, lighting, composition and mood while keeping \
            the original subject. Reply with the enhanced prompt only, no preamble and no quotes.\
            \n\nPrompt: {prompt}"
        )
    }

    /// Never fails: a degenerate completion or any provider error falls
    /// back to the original prompt.
    pub async fn enhance(&self, prompt: &str) -> String {
        let instruction = Self::build_instruction(prompt);
        match self.chat.complete(&instruction).await {
            Ok(completion) => {
                let enhanced = completion.trim();
                if enhanced.is_empty() || enhanced.len() <= prompt.len() {
                    info!("enhanced prompt is not longer than the original, keeping original");
                    return prompt.to_string();
                }
                info!("✅ Enhanced prompt ({} -> {} chars)", prompt.len(), enhanced.len());
                enhanced.to_string()
            }
            Err(e) => {
                warn!("❌ Prompt enhancement failed, using original prompt: {}", e);
                prompt.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct FixedChat(&'static str);

    #[async_trait]
    impl ChatProvider for FixedChat {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingChat;

    #[async_trait]
    impl ChatProvider for FailingChat {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Api("model unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn keeps_a_strictly_longer_completion_trimmed() {
        let enhancer =
            PromptEnhancer::new(Arc::new(FixedChat("  a cat, painted in watercolor, soft lighting  ")));
        let enhanced = enhancer.enhance("a cat").await;
        assert_eq!(enhanced, "a cat, painted in watercolor, soft lighting");
    }

    #[tokio::test]
    async fn falls_back_when_the_completion_is_not_longer() {
        let enhancer = PromptEnhancer::new(Arc::new(FixedChat("cat")));
        assert_eq!(enhancer.enhance("a house cat").await, "a house cat");
    }

    #[tokio::test]
    async fn falls_back_when_the_completion_is_empty() {
        let enhancer = PromptEnhancer::new(Arc::new(FixedChat("   ")));
        assert_eq!(enhancer.enhance("a cat").await, "a cat");
    }

    #[tokio::test]
    async fn absorbs_provider_failures() {
        let enhancer = PromptEnhancer::new(Arc::new(FailingChat));
        assert_eq!(enhancer.enhance("a cat").await, "a cat");
    }

    #[test]
    fn instruction_embeds_the_original_prompt() {
        let instruction = PromptEnhancer::build_instruction("a cat");
        assert!(instruction.ends_with("Prompt: a cat"));
    }
}
