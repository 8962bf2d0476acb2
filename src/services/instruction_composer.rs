// src/services/instruction_composer.rs
use crate::models::ImageOptions;

pub const BASE_INSTRUCTIONS: &str = r##"Analyze this image in detail for AI image generation tools such as Midjourney, DALL-E and Stable Diffusion. Provide:

1. MAIN PROMPT: One detailed, descriptive paragraph that would recreate this image as closely as possible. Preserve the original color scheme, framing, lighting and mood.

2. STYLE KEYWORDS: Between 5 and 10 short keywords describing the artistic style, medium and technique.

3. COLOR PALETTE: The 6 dominant colors of the image as hex codes (for example "#1A2B3C").

4. ALTERNATIVE PROMPTS:
   - concise: 1-2 direct sentences.
   - poetic: 1-2 evocative, artistic sentences.

Respond with a single JSON object and nothing else. The object must have exactly these fields:
"mainPrompt" (string), "styleKeywords" (array of strings), "colorPalette" (array of hex strings), "alternativePrompts" (object with "concise" and "poetic" strings)."##;

pub const REMOVE_TEXT_CLAUSE: &str = "IMPORTANT: The image must not contain any text. Do not describe or include any letters, words, numbers or typography in any of the prompts.";

pub const WHITE_BACKGROUND_CLAUSE: &str = "IMPORTANT: Place the subject on a solid, pure white background (#FFFFFF). Ignore the original background and describe only this plain white one in every prompt.";

pub const BLACK_BACKGROUND_CLAUSE: &str = "IMPORTANT: Place the subject on a solid, pure black background (#000000). Ignore the original background and describe only this plain black one in every prompt.";

const ADDITIONAL_INSTRUCTIONS_HEADER: &str = "The user has given the following additional instructions. They MUST be followed and applied to the main prompt and to both alternative prompts:";

/// Builds the instruction text sent alongside the image.
///
/// Optional clauses are appended after the base template in a fixed order:
/// text removal, background override, then the user's own instructions.
/// White background wins if both background flags are set.
pub fn compose(options: &ImageOptions) -> String {
    let mut clauses: Vec<String> = vec![BASE_INSTRUCTIONS.to_string()];

    if options.remove_text {
        clauses.push(REMOVE_TEXT_CLAUSE.to_string());
    }

    if options.white_background {
        clauses.push(WHITE_BACKGROUND_CLAUSE.to_string());
    } else if options.black_background {
        clauses.push(BLACK_BACKGROUND_CLAUSE.to_string());
    }

    if !options.additional_instructions.trim().is_empty() {
        clauses.push(format!(
            "{}\n{}",
            ADDITIONAL_INSTRUCTIONS_HEADER, options.additional_instructions
        ));
    }

    clauses.join("\n\n")
}
