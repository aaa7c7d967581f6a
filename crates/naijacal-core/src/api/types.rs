//! Request and response bodies for the NaijaCal backend.

use serde::{Deserialize, Serialize};

/// Body for `/register` and `/api/token/`.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

/// Successful `/register` or `/api/token/` response.
///
/// The token endpoint returns only `access` and `refresh`; `/register` adds
/// `username`. The refresh token is not kept.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Successful `/me` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Body for `/parse-log`.
#[derive(Debug, Clone, Serialize)]
pub struct ParseLogRequest<'a> {
    #[serde(rename = "foodLog")]
    pub food_log: &'a str,
}

/// One food detected in a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(rename = "item")]
    pub name: String,
    pub quantity: String,
    pub total_calories: f64,
    #[serde(default)]
    pub calories_today: Option<f64>,
}

/// Structured result of a parsed food log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    #[serde(rename = "parsed_items", default)]
    pub items: Vec<FoodItem>,
    pub total_calories: f64,
}

impl ParseResult {
    /// Checks the non-negative calorie rule.
    ///
    /// # Errors
    /// Returns a description of the first offending value.
    pub fn validate(&self) -> Result<(), String> {
        if is_negative(self.total_calories) {
            return Err(format!("negative total_calories: {}", self.total_calories));
        }
        if let Some(item) = self.items.iter().find(|i| is_negative(i.total_calories)) {
            return Err(format!(
                "negative total_calories for '{}': {}",
                item.name, item.total_calories
            ));
        }
        Ok(())
    }
}

fn is_negative(value: f64) -> bool {
    value.is_nan() || value < 0.0
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_result_from_backend_body() {
        let body = json!({
            "status": "success",
            "parsed_items": [
                {"item": "Rice", "quantity": "2 plates", "total_calories": 400, "calories_today": 400}
            ],
            "total_calories": 400
        });

        let result: ParseResult = serde_json::from_value(body).unwrap();
        assert_eq!(
            result.items,
            vec![FoodItem {
                name: "Rice".to_string(),
                quantity: "2 plates".to_string(),
                total_calories: 400.0,
                calories_today: Some(400.0),
            }]
        );
        assert!((result.total_calories - 400.0).abs() < f64::EPSILON);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_calories_today_may_be_absent_or_null() {
        let item: FoodItem = serde_json::from_value(json!({
            "item": "eba", "quantity": "1 derica", "total_calories": 1575.5, "calories_today": null
        }))
        .unwrap();
        assert_eq!(item.calories_today, None);

        let item: FoodItem = serde_json::from_value(json!({
            "item": "eba", "quantity": "1 derica", "total_calories": 1575.5
        }))
        .unwrap();
        assert_eq!(item.calories_today, None);
    }

    #[test]
    fn test_validate_rejects_negative_calories() {
        let result = ParseResult {
            items: vec![FoodItem {
                name: "yam".to_string(),
                quantity: "1 plate".to_string(),
                total_calories: -1.0,
                calories_today: None,
            }],
            total_calories: 10.0,
        };
        assert!(result.validate().is_err());
    }

    #[test]
    fn test_token_response_ignores_refresh() {
        let tokens: TokenResponse =
            serde_json::from_value(json!({"access": "a1", "refresh": "r1"})).unwrap();
        assert_eq!(tokens.access, "a1");
        assert_eq!(tokens.username, None);
    }

    #[test]
    fn test_credentials_request_omits_missing_email() {
        let body = serde_json::to_value(CredentialsRequest {
            username: "ada",
            password: "pw",
            email: None,
        })
        .unwrap();
        assert_eq!(body, json!({"username": "ada", "password": "pw"}));
    }

    #[test]
    fn test_parse_log_request_uses_camel_case_key() {
        let body = serde_json::to_value(ParseLogRequest { food_log: "rice" }).unwrap();
        assert_eq!(body, json!({"foodLog": "rice"}));
    }
}
