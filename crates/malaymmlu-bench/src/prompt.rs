use malaymmlu_core::{is_llama_family, BenchmarkRecord, ChatTemplate, EvalConfig, Result};

/// Answer cue appended to every question.
pub const ANSWER_CUE: &str = "Jawapan:";

/// Prompt, candidate options and gold index for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptedRecord {
    pub prompt: String,
    pub options: Vec<String>,
    pub gold: usize,
}

/// Turns a benchmark record into a scoring prompt.
pub trait BuildPrompt: Send + Sync {
    fn build(&self, record: &BenchmarkRecord) -> Result<PromptedRecord>;
}

impl<F> BuildPrompt for F
where
    F: Fn(&BenchmarkRecord) -> Result<PromptedRecord> + Send + Sync,
{
    fn build(&self, record: &BenchmarkRecord) -> Result<PromptedRecord> {
        self(record)
    }
}

/// MalayMMLU prompt layout. Zero-shot prompts are assembled from the record;
/// few-shot prompts use the dataset's pre-formatted columns.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    shot: u8,
    template: ChatTemplate,
    llama: bool,
}

impl PromptBuilder {
    pub fn new(shot: u8, template: ChatTemplate, llama: bool) -> Self {
        Self {
            shot,
            template,
            llama,
        }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        Self::new(
            config.shot,
            config.template(),
            is_llama_family(&config.base_model),
        )
    }

    fn zero_shot(&self, record: &BenchmarkRecord) -> String {
        let question = format!(
            "Berikut adalah soalan aneka pilihan tentang {}. Sila berikan jawapan sahaja.\n\n{}\n{}",
            record.subject, record.prompt_text, ANSWER_CUE
        );
        render_chat(self.template, &question)
    }

    fn few_shot(&self, record: &BenchmarkRecord) -> Result<String> {
        let question = record.few_shot_prompt(self.shot, self.llama)?;
        let mut prompt = render_chat(self.template, question);
        if self.llama {
            prompt.push_str(ANSWER_CUE);
        }
        Ok(prompt)
    }
}

impl BuildPrompt for PromptBuilder {
    fn build(&self, record: &BenchmarkRecord) -> Result<PromptedRecord> {
        let gold = record.gold_index()?;
        let prompt = match self.shot {
            0 => self.zero_shot(record),
            _ => self.few_shot(record)?,
        };

        Ok(PromptedRecord {
            prompt,
            options: record.options.clone(),
            gold,
        })
    }
}

/// Wraps `content` as a single user turn followed by the assistant header.
pub fn render_chat(template: ChatTemplate, content: &str) -> String {
    match template {
        ChatTemplate::Auto | ChatTemplate::Raw => content.to_string(),
        ChatTemplate::Llama3 => format!(
            "<|begin_of_text|><|start_header_id|>user<|end_header_id|>\n\n{content}<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n"
        ),
        ChatTemplate::Mistral => format!("<s>[INST]{content}[/INST]"),
        ChatTemplate::ChatMl => {
            format!("<|im_start|>user\n{content}<|im_end|>\n<|im_start|>assistant\n")
        }
    }
}
