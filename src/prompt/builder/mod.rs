
use chrono::{Datelike, NaiveDate};
use std::fmt;

use crate::config::PromptConfig;
use crate::llm::ChatMessage;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

const CONTEXT_RULES: &str = "1. PRIORITASKAN informasi dari konteks di atas untuk menjawab
2. Jika konteks relevan dengan pertanyaan → jawab berdasarkan konteks
3. Jika konteks tidak relevan → boleh jawab dari pengetahuan umum
4. SEBUTKAN jika jawabanmu berasal dari dokumen user
5. JANGAN mengarang informasi yang tidak ada di konteks";

const NO_CONTEXT_DIRECTIVE: &str = "User sepertinya bertanya tentang dokumen/materi yang diupload,
tapi tidak ada dokumen relevan yang ditemukan.

ATURAN: Beritahu user dengan sopan:
\"Maaf, saya tidak menemukan informasi tentang ini di knowledge base Anda.
Pastikan Anda sudah mengupload dokumen yang relevan, atau coba tanyakan
dengan kata kunci yang berbeda.\"

Setelah itu, BOLEH tawarkan bantuan umum jika relevan.";

pub const FORMAT_INSTRUCTIONS: &str = r"FORMAT JAWABAN:
- Gunakan markdown untuk memformat jawaban dengan baik
- Untuk kode program, SELALU gunakan code block dengan bahasa yang sesuai
- Gunakan heading (##, ###) untuk membagi bagian
- Gunakan bullet points dan numbered lists untuk poin-poin
- Gunakan bold (**teks**) untuk penekanan penting
- Gunakan inline code (`kode`) untuk nama fungsi, variabel, atau perintah

FORMAT MATEMATIKA (PENTING):
- Untuk rumus matematika, SELALU gunakan format LaTeX
- Rumus inline: gunakan $...$, contoh: $x^2 + y^2 = z^2$
- Rumus block: gunakan $$...$$, contoh: $$\frac{a}{b}$$";

/// Message prefixes of stored exchanges that are not part of the conversation
const NON_CONVERSATION_PREFIXES: [&str; 2] = ["PDF_UPLOAD:", "[IMAGE]"];

/// Marks stored messages that were answered by the fallback model
pub const FALLBACK_MODEL_TAG: &str = "[LLAMA] ";

/// Which model family the prompt is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFlavor {
    Gpt,
    Llama,
}

impl fmt::Display for ModelFlavor {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ModelFlavor::Gpt => write!(f, "gpt"),
            ModelFlavor::Llama => write!(f, "llama"),
        }
    }
}

/// Per-request inputs to the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemPromptOptions<'a> {
    pub flavor: ModelFlavor,
    pub is_guest: bool,
    /// Already formatted for display
    pub today: &'a str,
    /// Output of `build_context`; empty when nothing relevant was found
    pub context: &'a str,
    pub is_document_query: bool,
}

/// Assembles system prompts from the configured persona and facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    assistant_name: String,
    factual_notes: Vec<String>,
}

impl PromptBuilder {
    #[inline]
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            assistant_name: config.assistant_name.clone(),
            factual_notes: config.factual_notes.clone(),
        }
    }

    /// Persona, facts, retrieval context (or the no-context directive) and
    /// formatting rules, separated by blank lines
    #[inline]
    pub fn build_system_prompt(&self, options: &SystemPromptOptions<'_>) -> String {
        let mut parts = vec![
            self.persona(options.flavor, options.is_guest),
            self.factual_updates(options.today),
        ];

        if let Some(section) = retrieval_section(options.context, options.is_document_query) {
            parts.push(section);
        }

        parts.push(FORMAT_INSTRUCTIONS.to_string());
        parts.join("\n\n")
    }

    fn persona(&self, flavor: ModelFlavor, is_guest: bool) -> String {
        let model_note = match flavor {
            ModelFlavor::Gpt => "",
            ModelFlavor::Llama => " yang menggunakan Llama AI",
        };
        let memory_note = if is_guest {
            ""
        } else {
            " Kamu bisa mengingat percakapan sebelumnya dengan user."
        };

        format!(
            "Kamu adalah asisten belajar mahasiswa bernama {}{}.\nJawab dengan bahasa sederhana dan jelas.{}",
            self.assistant_name, model_note, memory_note
        )
    }

    fn factual_updates(&self, today: &str) -> String {
        let mut section = format!(
            "INFORMASI PENTING (UPDATE TERBARU):\n- Tanggal hari ini: {}",
            today
        );
        for note in &self.factual_notes {
            section.push_str("\n- ");
            section.push_str(note);
        }
        section
    }
}

fn retrieval_section(context: &str, is_document_query: bool) -> Option<String> {
    if !context.is_empty() {
        return Some(format!(
            "{RULE}\n📚 KONTEKS DARI KNOWLEDGE BASE USER (PRIORITAS TINGGI)\n{RULE}\n\n{context}\n\n{RULE}\n⚠️ ATURAN PENGGUNAAN KONTEKS:\n{RULE}\n{CONTEXT_RULES}"
        ));
    }

    is_document_query.then(|| {
        format!("{RULE}\n⚠️ TIDAK ADA KONTEKS DARI KNOWLEDGE BASE\n{RULE}\n\n{NO_CONTEXT_DIRECTIVE}")
    })
}

/// One stored question/answer pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatExchange {
    pub message: String,
    pub reply: String,
}

impl ChatExchange {
    #[inline]
    pub fn new(message: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reply: reply.into(),
        }
    }
}

/// Turn stored exchanges, newest first, into conversation history, oldest first
///
/// Upload and image records are dropped and the fallback-model tag is removed.
#[inline]
pub fn prepare_history(newest_first: Vec<ChatExchange>) -> Vec<ChatExchange> {
    newest_first
        .into_iter()
        .rev()
        .filter(|exchange| {
            !NON_CONVERSATION_PREFIXES
                .iter()
                .any(|prefix| exchange.message.starts_with(prefix))
        })
        .map(|exchange| ChatExchange {
            message: exchange
                .message
                .strip_prefix(FALLBACK_MODEL_TAG)
                .map_or_else(|| exchange.message.clone(), ToString::to_string),
            reply: exchange.reply,
        })
        .collect()
}

/// System prompt, then each past exchange as a user/assistant pair, then the new message
#[inline]
pub fn build_messages(
    system_prompt: String,
    history: &[ChatExchange],
    message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(system_prompt));
    for exchange in history {
        messages.push(ChatMessage::user(exchange.message.as_str()));
        messages.push(ChatMessage::assistant(exchange.reply.as_str()));
    }
    messages.push(ChatMessage::user(message));
    messages
}

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Long Indonesian date, e.g. `20 Oktober 2024`
#[inline]
pub fn format_indonesian_date(date: NaiveDate) -> String {
    let month = MONTHS
        .get(date.month0() as usize)
        .copied()
        .unwrap_or_default();
    format!("{} {} {}", date.day(), month, date.year())
}
