use anyhow::Result;
use serde::Serialize;

use reelgate::SearchResult;

use crate::OutputFormat;

/// Print search results in the requested format.
pub fn print_results(results: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(results),
        OutputFormat::Text => {
            for result in results {
                println!("{}", summary_line(result));
            }
            println!("\n({} results)", results.len());
            Ok(())
        }
    }
}

/// Print one title with its episode list.
pub fn print_detail(result: &SearchResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Text => {
            println!("{}", summary_line(result));
            if !result.desc.is_empty() {
                println!("\n{}\n", truncate_text(&result.desc, 300));
            }
            for (i, episode) in result.episodes.iter().enumerate() {
                let title = result.episode_titles.get(i).map_or("", String::as_str);
                println!("{i:>4}  {title:<16} {episode}");
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn summary_line(result: &SearchResult) -> String {
    format!(
        "[{}] {} ({}) - {} episodes  id={}",
        result.source_name,
        result.title,
        result.year,
        result.episodes.len(),
        result.id
    )
}

/// Truncate on a char boundary.
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_multibyte_chars() {
        assert_eq!(truncate_text("短剧故事", 2), "短剧...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn summary_line_names_source_and_count() {
        let result = SearchResult {
            id: "42".into(),
            title: "Show".into(),
            year: "2020".into(),
            source_name: "Catalog".into(),
            episodes: vec!["a".into(), "b".into()],
            ..SearchResult::default()
        };
        assert_eq!(summary_line(&result), "[Catalog] Show (2020) - 2 episodes  id=42");
    }
}
