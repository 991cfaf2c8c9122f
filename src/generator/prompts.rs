//! 各阶段使用的提示词

use crate::i18n::TargetLanguage;

pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// 生成检索词的提示词
pub fn query_writer_prompt(topic: &str, number_queries: usize, current_date: &str) -> PromptPair {
    let system = format!(
        r#"You are a research librarian who designs search queries for academic paper databases such as arXiv, PubMed and Semantic Scholar.

Guidelines:
- Produce {number_queries} distinct queries.
- Each query covers a different aspect of the research topic.
- Phrase every query the way a scientist would type it into a paper database, specific enough to surface technical papers.
- Today is {current_date}. Prefer wording that surfaces recent work where it matters.

Return a JSON object with the keys "query" (the list of queries) and "rationale" (one or two sentences on how the queries split the topic)."#
    );
    let user = format!("Research topic: {topic}");
    PromptPair { system, user }
}

/// 反思已有摘要、查找知识缺口的提示词
pub fn reflection_prompt(topic: &str, abstracts: &str, current_date: &str) -> PromptPair {
    let system = format!(
        r#"You are a senior scientific analyst. Today is {current_date}.
You judge whether a set of literature abstracts about "{topic}" is enough to write a thorough scientific report.

Guidelines:
- Read every abstract.
- Decide whether the key aspects of the topic are covered.
- If coverage is sufficient, set "is_sufficient" to true, leave "knowledge_gap" empty and return no follow-up queries.
- Otherwise describe the missing piece in "knowledge_gap" and write targeted academic search queries in "follow_up_queries" that would close it."#
    );
    let user = format!("Abstracts:\n{abstracts}");
    PromptPair { system, user }
}

/// 撰写最终报告的提示词
pub fn report_prompt(
    topic: &str,
    context: &str,
    current_date: &str,
    target_language: &TargetLanguage,
) -> PromptPair {
    let system = format!(
        r#"You are a scientific writer preparing a well-structured report on "{topic}". Today is {current_date}.

Guidelines:
- Weave the supplied literature into one coherent narrative instead of listing papers one by one.
- Organise the report with clear headings and give a complete overview of the topic.
- Write for readers who know the general field but need an update on this topic.
- Present findings only. Do not describe how the literature was collected.
- {language}"#,
        language = target_language.prompt_instruction()
    );
    let user = format!("Research topic:\n{topic}\n\nLiterature:\n{context}");
    PromptPair { system, user }
}
