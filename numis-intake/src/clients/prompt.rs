//! Analysis prompts

/// JSON shape requested from the model, shared by every language
const RESPONSE_SHAPE: &str = r#"{
  "name": "",
  "country": "",
  "year": 0,
  "face_value": "",
  "currency": "",
  "material": "",
  "description": "",
  "km_code": "",
  "min_value": 0.0,
  "max_value": 0.0,
  "grade": "",
  "notes": "",
  "weight_g": 0.0,
  "diameter_mm": 0.0,
  "thickness_mm": 0.0,
  "edge": "",
  "shape": "",
  "mint": "",
  "mintage": 0
}"#;

const PROMPT_ES: &str = "Eres un experto numismático. Recibes dos fotografías de la misma moneda: \
la primera es el anverso y la segunda el reverso. Ignora el fondo, la cápsula o el cartón y \
analiza solo el disco metálico.\n\
Identifica la moneda y estima su estado de conservación usando la escala española \
(MC, RC, BC, MBC, EBC, SC, FDC, PROOF). Indica el año como número entero (0 si no es legible), \
la tirada como número entero (0 si se desconoce) y los valores estimados de mercado en euros.\n\
Responde ÚNICAMENTE con un objeto JSON válido, sin Markdown, con esta estructura:\n";

const PROMPT_EN: &str = "You are an expert numismatist. You receive two photographs of the same coin: \
the first is the obverse and the second the reverse. Ignore the background, capsule or holder and \
analyze only the metal disc.\n\
Identify the coin and estimate its grade using the scale (AG, G, VG, F, VF, XF, UNC, PROOF). \
Give the year as an integer (0 if unreadable), the mintage as an integer (0 if unknown) and the \
estimated market values in euros.\n\
Reply ONLY with a valid JSON object, without Markdown, using this structure:\n";

/// Prompt for `language`; anything starting with "en" is English, the rest Spanish
pub fn analysis_prompt(language: &str) -> String {
    let intro = if language.trim().to_lowercase().starts_with("en") {
        PROMPT_EN
    } else {
        PROMPT_ES
    };
    format!("{}{}", intro, RESPONSE_SHAPE)
}
