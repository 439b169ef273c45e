//! Prompt templates for the research pipeline.

pub fn query_generation(topic: &str, num_queries: usize) -> String {
    format!(
        r#"You are a research assistant helping to generate effective search queries.

Topic: {topic}

Generate {num_queries} diverse and specific search queries that will help gather comprehensive information about this topic.
The queries should:
1. Cover different aspects of the topic
2. Include both broad and specific angles
3. Be optimized for web search engines
4. Target recent and authoritative sources

Return ONLY the queries, one per line, without numbering or additional text."#
    )
}

pub fn content_analysis(topic: &str, content: &str) -> String {
    format!(
        r#"Analyze the following content and extract key information relevant to the research topic.

Topic: {topic}
Content: {content}

Extract:
1. Main points and key findings
2. Important statistics or data
3. Notable quotes or claims
4. Source credibility indicators

Provide a structured summary focusing on relevance to the topic."#
    )
}

pub fn synthesis(topic: &str, information: &str) -> String {
    format!(
        r#"You are synthesizing research findings into a coherent academic report.

Research Topic: {topic}
Gathered Information: {information}

Create a well-structured research report with the following sections:
1. Abstract (150-200 words)
2. Introduction
3. Background/Literature Review
4. Main Findings (organize by themes)
5. Discussion
6. Conclusion
7. Future Work

Requirements:
- Use formal academic language
- Maintain objectivity
- Cite sources appropriately using [Source X] notation
- Ensure logical flow between sections
- Highlight key insights and patterns
- Be comprehensive but concise"#
    )
}
