use clausecode_store::NewAnalysis;

/// A complete analysis with the given timestamp and agent.
pub fn sample_analysis(timestamp: &str, agent: &str) -> NewAnalysis {
    NewAnalysis {
        timestamp: timestamp.to_string(),
        agent: agent.to_string(),
        analysis_type: "summary".to_string(),
        page_title: "Terms of Service".to_string(),
        page_url: "https://example.com/terms".to_string(),
        result_text: format!("{agent} reviewed the terms"),
        page_content: None,
        user_id: None,
        metadata: None,
    }
}
