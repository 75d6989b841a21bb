//! System instruction for the refinement engine.
//!
//! The instruction is fixed directive blocks chosen by the request's
//! selections, followed by a freshness nonce that stops the provider from
//! treating back-to-back requests as one conversation.

use chrono::Local;
use sha2::{Digest, Sha256};

use super::request::{DetailLevel, Language, OutputType, RefinementRequest};

const APPROACH_HINTS: [&str; 5] = [
    "FRESH_PERSPECTIVE: Approach this as a completely new request, ignore any previous context or patterns.",
    "CREATIVE_RESET: Think creatively with a clean slate, no reference to previous interactions.",
    "ORIGINAL_THINKING: Apply innovative structuring without conventional bias from prior responses.",
    "NOVEL_APPROACH: Generate unique insights with creative refinement, start fresh.",
    "INDEPENDENT_ANALYSIS: Treat this as the first and only request, analyze independently.",
];

/// Per-request random decoration appended to the instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessNonce {
    pub timestamp: String,
    pub prompt_hash: String,
    pub seed: u32,
    pub session_id: u32,
    pub hint: &'static str,
}

impl FreshnessNonce {
    pub fn generate(prompt: &str) -> Self {
        let digest = Sha256::digest(prompt.as_bytes());
        let prompt_hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        Self {
            timestamp: Local::now().format("%Y%m%d_%H%M%S_%6f").to_string(),
            prompt_hash,
            seed: 10_000 + rand::random::<u32>() % 90_000,
            session_id: 100_000 + rand::random::<u32>() % 900_000,
            hint: APPROACH_HINTS[rand::random::<u32>() as usize % APPROACH_HINTS.len()],
        }
    }

    fn block(&self) -> String {
        format!(
            "\n\nSESSION_RESET_CONTEXT: NEW_REQUEST_{}_{}_{}_{}\
             \nAPPROACH_DIRECTIVE: {}\
             \nIMPORTANT: Completely disregard any previous conversation history or topic patterns. This is a fresh, independent request.",
            self.timestamp, self.prompt_hash, self.seed, self.session_id, self.hint
        )
    }
}

fn example_format(language: Language) -> &'static str {
    match language {
        Language::Indonesian => {
            r#"{"refined_prompt": "versi yang telah diperbaiki dalam bahasa Indonesia"}"#
        }
        Language::English => r#"{"refined_prompt": "improved version in English language"}"#,
    }
}

fn language_instruction(language: Language, output_type: OutputType) -> &'static str {
    match (language, output_type.is_media()) {
        (Language::Indonesian, true) => concat!(
            "Prompt hasil akhir HARUS sepenuhnya dalam Bahasa Indonesia jika konteksnya memang membutuhkan, ",
            "namun untuk prompt gambar, video, audio, langsung buat prompt yang jelas dan to the point tanpa instruksi bahasa eksplisit. ",
            "Jangan tambahkan instruksi meta, disclaimer, recap, atau kalimat seperti 'sebelum menjawab' atau 'periksa pemahaman'. ",
            "Jangan tambahkan nama penulis, sumber, atau embel-embel seperti 'by', 'created by', 'written by', atau sejenisnya, kecuali memang diminta secara eksplisit oleh user dalam prompt aslinya. ",
            "Langsung buatkan output sesuai permintaan user, tanpa basa-basi."
        ),
        (Language::Indonesian, false) => concat!(
            "Prompt hasil akhir HARUS sepenuhnya dalam Bahasa Indonesia. ",
            "Tambahkan instruksi eksplisit di awal refined_prompt: 'Tulis seluruh jawaban dalam Bahasa Indonesia.' ",
            "Jangan tambahkan instruksi meta, disclaimer, recap, atau kalimat seperti 'sebelum menjawab' atau 'periksa pemahaman'. ",
            "Jangan tambahkan nama penulis, sumber, atau embel-embel seperti 'by', 'created by', 'written by', atau sejenisnya, kecuali memang diminta secara eksplisit oleh user dalam prompt aslinya. ",
            "Langsung buatkan output sesuai permintaan user, tanpa basa-basi."
        ),
        (Language::English, true) => concat!(
            "The final prompt MUST be in English if required by the context, ",
            "but for image, video, audio prompts, just provide a direct, clear prompt without explicit language instructions. ",
            "Do not add meta instructions, disclaimers, recaps, or sentences like 'before answering' or 'check your understanding'. ",
            "Do not add author names, sources, or any attribution such as 'by', 'created by', 'written by', or similar, unless the user explicitly requests it in the original prompt. ",
            "Go straight to the requested output, no preamble."
        ),
        (Language::English, false) => concat!(
            "The final prompt MUST be entirely in English. ",
            "Add an explicit instruction at the beginning of the refined_prompt: 'Respond entirely in English.' ",
            "Do not add meta instructions, disclaimers, recaps, or sentences like 'before answering' or 'check your understanding'. ",
            "Do not add author names, sources, or any attribution such as 'by', 'created by', 'written by', or similar, unless the user explicitly requests it in the original prompt. ",
            "Go straight to the requested output, no preamble."
        ),
    }
}

fn language_enforcement(language: Language) -> &'static str {
    match language {
        Language::Indonesian => concat!(
            "\n\nABSOLUTE_LANGUAGE_REQUIREMENT: ",
            "The refined prompt MUST be written entirely in Bahasa Indonesia. ",
            "This is NON-NEGOTIABLE. Every word, instruction, and explanation must be in Indonesian. ",
            "Do NOT mix languages. Do NOT use English words unless they are commonly used technical terms in Indonesian. ",
            "If the input prompt contains English, TRANSLATE and ENHANCE it to Indonesian. ",
            "VERIFY that your output is 100% Indonesian before sending."
        ),
        Language::English => concat!(
            "\n\nABSOLUTE_LANGUAGE_REQUIREMENT: ",
            "The refined prompt MUST be written entirely in English. ",
            "This is NON-NEGOTIABLE. Every word, instruction, and explanation must be in English. ",
            "Do NOT mix languages. Do NOT use other languages. ",
            "If the input prompt contains other languages, TRANSLATE and ENHANCE it to English. ",
            "VERIFY that your output is 100% English before sending."
        ),
    }
}

fn type_clause(output_type: OutputType) -> &'static str {
    match output_type {
        OutputType::ImageGeneration => "\n\nPROMPT TYPE: This prompt is intended for generating images. Structure the refined prompt so it is optimal for image generation models (e.g., Stable Diffusion, Midjourney, DALL-E, etc).",
        OutputType::AudioGeneration => "\n\nPROMPT TYPE: This prompt is intended for generating audio. Structure the refined prompt for optimal audio generation models (e.g., MusicLM, Suno, etc).",
        OutputType::VideoGeneration => "\n\nPROMPT TYPE: This prompt is intended for generating videos. Structure the refined prompt for video generation models (e.g., Sora, Runway, Pika, etc).",
        OutputType::VideoAudioGeneration => "\n\nPROMPT TYPE: This prompt is intended for generating videos with audio. Structure the refined prompt for models that generate both video and audio.",
        OutputType::TextGeneration => "\n\nPROMPT TYPE: This prompt is intended for generating text. Structure the refined prompt for optimal text generation (e.g., ChatGPT, Gemini, Claude, etc).",
        OutputType::Novel => "\n\nPROMPT TYPE: This prompt is for generating a novel or long-form story. Structure the refined prompt for creative writing and narrative generation.",
        OutputType::Explanation => "\n\nPROMPT TYPE: This prompt is for generating explanations or educational content. Structure the refined prompt for clear, informative, and didactic output.",
        OutputType::Other => "\n\nPROMPT TYPE: The prompt type is custom or not listed. Structure the refined prompt according to the user's intent.",
    }
}

fn detail_clause(detail: DetailLevel) -> &'static str {
    match detail {
        DetailLevel::Simple => "\n\nDETAIL LEVEL: The refined prompt should be concise and straightforward, focusing only on the essential information needed for the task. Avoid unnecessary elaboration.",
        DetailLevel::Detailed => "\n\nDETAIL LEVEL: The refined prompt should be well-structured, clear, and provide sufficient detail for high-quality output, but avoid excessive complexity.",
        DetailLevel::Complex => "\n\nDETAIL LEVEL: The refined prompt should be highly detailed, comprehensive, and cover all relevant aspects, including edge cases, constraints, and advanced requirements. Use multiple paragraphs and line breaks for clarity.",
        DetailLevel::Template => "\n\nDETAIL LEVEL: The refined prompt should be a template with clearly marked sections (e.g., [CONTEXT], [LEVEL], [EXPECTATION], [ASSUMPTION], [REVIEW]) and use '...' or '[isi di sini]' as placeholders for the user to fill in after copying. Use line breaks and bullet points where appropriate. Do not generate any actual content, only the template structure.",
    }
}

const CLEAR_METHOD: &str = "\n\nMANDATORY: Use the CLEAR method for prompt engineering. \
Structure the refined prompt so it covers:\n\
- Context: Provide enough background and situation for the task.\n\
- Level: Specify the user's skill level or assumed audience (beginner, intermediate, expert, etc) if possible.\n\
- Expectation: Clearly state the expected output, format, or result.\n\
- Assumption: Mention any important assumptions or constraints.\n\
- Review: Ensure the prompt is direct and ready to use, with no recap, meta-instructions, or extra reminders. \
The output must be a clean, ready-to-use prompt for the target AI, with no additional instructions or preambles.\n\
If any element is missing from the input, infer or add it to make the prompt complete and high quality.";

const BEST_PRACTICES: &str = "\n\nBEST PRACTICES FOR PROMPT REFINEMENT (MANDATORY):\n\
- Always provide a prompt that is clear, specific, and structured for optimal AI understanding.\n\
- Add relevant context, background, or scenario if missing.\n\
- Use keywords and constraints that help AI focus on the user's intent.\n\
- Specify the desired output format, style, or tone if relevant.\n\
- Avoid ambiguity and generalities; be as descriptive as possible.\n\
- If the prompt is for a particular domain (e.g., programming, novel, science), use terminology and structure that fits that domain.\n\
- If the user input is vague, infer and add missing details to make the prompt actionable and high quality.\n\
- Do NOT simply translate or rephrase; always enhance the prompt for best results.\n\
- Never add explanations, comments, or options. Return only the improved prompt as required.";

const FORMATTING: &str = "\n\nFORMATTING:\n\
- Use line breaks (\\n) for each logical section or bullet point.\n\
- If using bullet points, use '*' or '-' at the start of the line.\n\
- If you want to emphasize a word or phrase, use double asterisks (e.g., **important**).\n\
- Do not use markdown formatting for headings, just plain text with line breaks and bullets.\n\
- Ensure the output is easy to read and copy-paste into other tools.";

/// Build the system instruction for `request`. Pure for a given nonce.
pub fn build_system_instruction(request: &RefinementRequest, nonce: &FreshnessNonce) -> String {
    let language = request.language;
    let scope = &request.scope;

    let mut out = String::with_capacity(6 * 1024);

    out.push_str(
        "You are a prompt refinement engine. Your ONLY task is to IMPROVE and REWRITE the input prompt, \
         not just translate it.\n\n\
         CRITICAL RESET: Ignore all previous conversation history, topics, and context. This is a completely fresh request.\n\n\
         STRICT RULES:\n",
    );
    out.push_str(&format!(
        "- Return ONLY a JSON object with this exact format: {}\n",
        example_format(language)
    ));
    out.push_str(
        "- Do NOT add explanations, comments, or multiple options\n\
         - Do NOT use markdown formatting for headings\n\
         - Do NOT add introductory or closing text\n\
         - Focus on: clarity, specificity, and good structure\n\
         - The refined_prompt value must be a significantly improved and rewritten version of the input prompt, \
         not just a translation\n",
    );
    out.push_str(&format!(
        "- CRITICAL LANGUAGE REQUIREMENT: {}\n",
        language_instruction(language, request.output_type)
    ));
    out.push_str(
        "- If the input is not in the target language, always rewrite and refine it in the target language\n\
         - NEVER mix languages in your response\n\
         - Do NOT simply translate; always rewrite and enhance the prompt for better AI understanding",
    );

    out.push_str(language_enforcement(language));

    out.push_str(&format!(
        "\n\nSTRICT_PREFERENCE_ISOLATION: \
         Current Settings - Language: {}, Scope: {}, Type: {}, Detail: {}. \
         These settings are for THIS REQUEST ONLY. Do NOT carry over any assumptions from previous requests. \
         Do NOT reference or build upon previous topics unless explicitly mentioned in the current input. \
         Treat each request as completely independent and fresh. \
         The scope '{}' is the ONLY context domain for this request.",
        language, scope, request.output_type, request.detail, scope
    ));

    out.push_str(type_clause(request.output_type));

    let context = request.context.trim();
    if !context.is_empty() {
        out.push_str(&format!(
            "\n\nADDITIONAL CONTEXT:\n{}\nYou MUST use this context to help you rewrite and improve the prompt.",
            context
        ));
    }

    if !scope.is_general() {
        out.push_str(&format!(
            "\n\nSCOPE: The prompt is for the following domain or context: {}. \
             Make sure the refined prompt is suitable and optimal for this scope.",
            scope
        ));
    }

    out.push_str(detail_clause(request.detail));
    out.push_str(CLEAR_METHOD);
    out.push_str(BEST_PRACTICES);
    out.push_str(FORMATTING);
    out.push_str(&nonce.block());

    out
}
