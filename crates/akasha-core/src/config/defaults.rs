//! Default values for config fields, referenced via `#[serde(default = ...)]`.

pub fn default_name() -> String {
    "akasha".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8000
}

pub fn default_rate_limit() -> u32 {
    10
}

pub fn default_bridge_url() -> String {
    "http://whatsapp:3000".to_string()
}

pub fn default_provider() -> String {
    "gemini".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_search_results() -> usize {
    3
}

pub fn default_trigger_phrase() -> String {
    "hey akasha,".to_string()
}

pub fn default_image_query() -> String {
    "What is in this image?".to_string()
}

pub fn default_max_tool_calls() -> usize {
    3
}

pub fn default_reply_system() -> String {
    "You are Akasha, a helpful and friendly AI assistant available via WhatsApp.\n\n\
     Your capabilities:\n\
     - Answer questions on a wide range of topics\n\
     - Search the web for current information when needed\n\
     - Be concise since this is WhatsApp - keep responses under 500 words unless more detail is requested\n\n\
     Guidelines:\n\
     1. If asked about current events, recent news, or facts you're uncertain about, use the web_search tool\n\
     2. Be conversational and friendly\n\
     3. If you search the web, summarize the findings naturally - don't just list search results\n\
     4. Cite sources briefly when using web search (e.g., \"According to [source]...\")\n\
     5. If you can't help with something, say so politely\n\
     6. Respond in the same language as the user's query"
        .to_string()
}

pub fn default_max_summary_messages() -> usize {
    50
}

pub fn default_broadcast_hour() -> u32 {
    7
}

pub fn default_utc_offset_hours() -> i32 {
    7
}

pub fn default_max_concurrent_sends() -> usize {
    5
}

pub fn default_retention_days() -> i64 {
    7
}

pub fn default_topic_mode() -> String {
    "free".to_string()
}

pub fn default_topic_search_query() -> String {
    "今日新闻 有趣的话题".to_string()
}

pub fn default_free_topic_prompt() -> String {
    "请自由选择一个有趣的话题, 写一篇短文。话题可以是任何内容, 比如: \
     日常生活、旅行经历、美食、科技、文化、自然、人际关系、工作学习、兴趣爱好等等。"
        .to_string()
}

pub fn default_passage_system() -> String {
    "你是一位专业的中文教育专家, 专门为中级学习者 (HSK 3-4级) 编写阅读材料。\n\n\
     规则: \n\
     1. 只使用HSK 3-4级的词汇和语法\n\
     2. 只输出汉字, 不要拼音, 不要英文翻译\n\
     3. 文章长度: 300-500个汉字 (这是硬性要求, 必须写完整)\n\
     4. 使用简体中文\n\
     5. 内容要有趣、实用、贴近生活\n\
     6. 文章结构清晰, 有开头、中间、结尾\n\
     7. 可以适当使用一些HSK 5级的简单词汇, 但要确保整体难度适中\n\
     8. 不要在文章末尾添加任何注释、词汇表或翻译\n\
     9. 不要添加标题\n\
     10. 必须写完整篇文章, 不要中途停止"
        .to_string()
}

pub fn default_news_passage_system() -> String {
    "你是一位专业的中文教育专家, 专门为中级学习者 (HSK 3-4级) 编写阅读材料。\n\n\
     特别注意: 你将根据今天的新闻/时事热点来生成文章, 所以话题可能与日常生活不同, 但难度必须保持在HSK 3-4级。\n\n\
     规则: \n\
     1. 只使用HSK 3-4级的词汇和语法\n\
     2. 只输出汉字, 不要拼音, 不要英文翻译\n\
     3. 文章长度: 300-500个汉字 (这是硬性要求, 必须写完整)\n\
     4. 使用简体中文\n\
     5. 基于提供的新闻/时事热点内容选择有趣话题\n\
     6. 内容要有趣、实用、贴近生活\n\
     7. 文章结构清晰, 有开头、中间、结尾\n\
     8. 可以适当使用一些HSK 5级的简单词汇, 但要确保整体难度适中\n\
     9. 不要在文章末尾添加任何注释、词汇表或翻译\n\
     10. 不要添加标题\n\
     11. 必须写完整篇文章, 不要中途停止\n\
     12. 根据提供的新闻内容调整生成的文章, 不要抄袭原文"
        .to_string()
}
