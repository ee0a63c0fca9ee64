//! Safe-SELECT validation (§4.5.2).
//!
//! A pure syntactic gate applied to every statement the engine is about to
//! run, whether builder-emitted or supplied to `execute_raw`. Grounded on
//! `original_source/backend/query_generation/query_executor.py`'s
//! `_validate_sql` guard.

const FORBIDDEN_KEYWORDS: &[&str] = &["DROP", "DELETE", "TRUNCATE", "ALTER", "INSERT", "UPDATE", "CREATE", "EXEC"];

fn contains_whole_word(haystack: &str, word: &str) -> bool {
    haystack.split(|c: char| !c.is_alphanumeric() && c != '_').any(|token| token.eq_ignore_ascii_case(word))
}

fn parens_balanced(sql: &str) -> bool {
    let mut depth = 0i32;
    for c in sql.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Rejects anything that isn't a plain read-only SELECT. No repair is
/// attempted here — a failure here is immediate and final for the attempt.
pub fn validate(sql: &str) -> Result<(), String> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err("empty SQL statement".to_string());
    }

    if !trimmed.to_uppercase().starts_with("SELECT") {
        return Err("statement must begin with SELECT".to_string());
    }

    if !contains_whole_word(trimmed, "FROM") {
        return Err("statement is missing a FROM clause".to_string());
    }

    for keyword in FORBIDDEN_KEYWORDS {
        if contains_whole_word(trimmed, keyword) {
            return Err(format!("statement contains forbidden keyword {keyword}"));
        }
    }

    if !parens_balanced(trimmed) {
        return Err("unbalanced parentheses".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        assert!(validate("SELECT SUM(total_amount) AS value FROM sales").is_ok());
    }

    #[test]
    fn rejects_missing_from() {
        assert!(validate("SELECT 1").is_err());
    }

    #[test]
    fn rejects_destructive_statement() {
        assert!(validate("DROP TABLE sales").is_err());
    }

    #[test]
    fn rejects_keyword_disguised_as_substring_is_still_allowed() {
        // "updated_at" contains "update" only as a substring, not a whole word.
        assert!(validate("SELECT updated_at FROM sales").is_ok());
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(validate("SELECT SUM(total_amount FROM sales").is_err());
    }
}
