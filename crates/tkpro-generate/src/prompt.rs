//! Prompt builders.

/// Temperature for batch copy generation. Fixed and high: the batch favors
/// varied copy over per-item tuning.
pub const BATCH_TEMPERATURE: f64 = 0.85;

/// Temperature for headline lookups.
pub const HEADLINE_TEMPERATURE: f64 = 0.3;

/// Keys the batch prompt asks for, in prompt order.
pub const CONTENT_KEYS: [&str; 6] = [
    "title_en",
    "title_zh",
    "description_en",
    "description_zh",
    "script_en",
    "script_zh",
];

/// Prompt requesting bilingual listing copy for one product as a single
/// JSON object with the keys in [`CONTENT_KEYS`].
#[must_use]
pub fn batch_prompt(product_name: &str) -> String {
    format!(
        r#"You are a veteran TikTok Shop seller writing your own listing copy. Write like a person who has sold thousands of units, not like an assistant.
Product: "{product_name}"

Rules:
1. Voice: excited, genuine, a little urgent. Everyday language, platform slang where it fits.
2. Structure every description as: hook, pain point, solution, social proof, call to action.
3. Output strict JSON only. No markdown, no code fences, no asterisks, no hash signs. Real emoji are fine.
4. Write the English and Chinese versions separately so each reads as native copy. Never translate one from the other word for word.

Return exactly this object:
{{
  "title_en": "SEO title in English, one emoji, at most 80 characters, leads with the benefit",
  "title_zh": "中文爆款标题，一个表情，直击痛点",
  "description_en": "About 200 words. Paragraph 1: emotional hook and pain point. Paragraph 2: key features as emoji bullets. Paragraph 3: urgency and call to action.",
  "description_zh": "约200字。第一段：开头钩子与痛点。第二段：核心卖点，用表情符号做列表。第三段：限时紧迫感与下单引导。",
  "script_en": "30-second video script. Scene 1 (0-3s): visual hook. Scene 2 (3-15s): demo solving the problem. Scene 3 (15-25s): value and proof. Scene 4 (25-30s): strong call to action.",
  "script_zh": "30秒带货视频脚本。镜头1 (0-3s)：视觉钩子。镜头2 (3-15s)：演示解决问题。镜头3 (15-25s)：价值与信任背书。镜头4 (25-30s)：引导下单。"
}}

Reply with the JSON object and nothing else."#
    )
}

/// Prompt asking for the single most recent headline from `site` about
/// `topic`, as short plain Simplified Chinese.
#[must_use]
pub fn headline_prompt(site: &str, topic: &str) -> String {
    format!(
        "Find the most recent important news headline published by \"{site}\" about \"{topic}\". \
         Answer with the headline only, in Simplified Chinese, under 25 words. \
         No quotation marks, no date, no introduction."
    )
}
