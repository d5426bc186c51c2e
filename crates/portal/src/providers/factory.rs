use super::{base::Provider, configs::ProviderConfig, openai::OpenAiProvider};
use anyhow::Result;

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Ollama(ollama_config) => {
            Ok(Box::new(OpenAiProvider::ollama(ollama_config)?))
        }
    }
}
