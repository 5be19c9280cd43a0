use serde_json::{Map, Value};

use crate::core::errors::RagError;

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, u16::MAX as u64)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(storage) = expect_optional_object(root, "storage")? {
        validate_optional_string_field(storage, "storage.db_path", "db_path")?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        if let Some(provider) = embedding.get("provider") {
            match provider.as_str() {
                Some("hashing") | Some("openai") => {}
                Some(other) => {
                    return Err(RagError::Validation(format!(
                        "Invalid config at 'embedding.provider': unknown provider '{}'",
                        other
                    )))
                }
                None => return Err(config_type_error("embedding.provider", "string")),
            }
        }
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 1, 65_536)?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
    }

    if let Some(prompt) = expect_optional_object(root, "prompt")? {
        validate_u64_field(
            prompt,
            "prompt.max_context_chars",
            "max_context_chars",
            1,
            10_000_000,
        )?;
        validate_optional_string_field(prompt, "prompt.fallback_phrase", "fallback_phrase")?;
    }

    if let Some(generation) = expect_optional_object(root, "generation")? {
        validate_optional_string_field(generation, "generation.model", "model")?;
        validate_optional_string_field(generation, "generation.base_url", "base_url")?;
        validate_f64_field(generation, "generation.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(generation, "generation.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(generation, "generation.timeout_secs", "timeout_secs", 1, 86_400)?;
        validate_u64_field(
            generation,
            "generation.attempt_timeout_secs",
            "attempt_timeout_secs",
            1,
            86_400,
        )?;

        if let Some(retry) = expect_optional_object(generation, "retry")? {
            validate_u64_field(retry, "generation.retry.max_attempts", "max_attempts", 1, 20)?;
            validate_u64_field(
                retry,
                "generation.retry.initial_delay_ms",
                "initial_delay_ms",
                0,
                600_000,
            )?;
            validate_u64_field(
                retry,
                "generation.retry.max_delay_ms",
                "max_delay_ms",
                0,
                600_000,
            )?;
            validate_f64_field(retry, "generation.retry.multiplier", "multiplier", 1.0, 10.0)?;
            validate_f64_field(retry, "generation.retry.jitter", "jitter", 0.0, 1.0)?;
        }
    }

    if let Some(feedback) = expect_optional_object(root, "feedback")? {
        validate_i64_field(feedback, "feedback.min_rating", "min_rating", -100, 100)?;
        validate_i64_field(feedback, "feedback.max_rating", "max_rating", -100, 100)?;
        let min = feedback.get("min_rating").and_then(Value::as_i64);
        let max = feedback.get("max_rating").and_then(Value::as_i64);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(RagError::Validation(
                    "Invalid config at 'feedback': min_rating exceeds max_rating".to_string(),
                ));
            }
        }
    }

    if let Some(evaluation) = expect_optional_object(root, "evaluation")? {
        validate_u64_field(evaluation, "evaluation.k", "k", 1, 1_000)?;
        validate_u64_field(
            evaluation,
            "evaluation.concurrency",
            "concurrency",
            1,
            256,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    section: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match section.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "non-negative integer"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_i64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: i64,
    max: i64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_i64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::Validation(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(RagError::Validation(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn out_of_range<T: std::fmt::Display>(path: &str, min: T, max: T) -> RagError {
    RagError::Validation(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Validation(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
