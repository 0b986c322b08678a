mod common;

use axum::http::StatusCode;
use common::{post_json, row, seeded_store, ScriptedProvider, LEARNER};
use serde_json::json;

const PATH_PROMPT: &str = "Create a personalised learning path";

#[tokio::test]
async fn test_content_ranked_for_weak_areas() {
    let app = common::create_test_app(seeded_store(), ScriptedProvider::unreachable());

    let (status, body) = post_json(
        &app,
        "/api/v1/recommendations/content",
        json!({
            "user_id": LEARNER,
            "limit": 2,
            "candidates": [
                {
                    "id": "geo-hard", "subject": "geometry", "difficulty": "hard",
                    "estimated_minutes": 45
                },
                {
                    "id": "music", "subject": "music", "difficulty": "easy",
                    "estimated_minutes": 45
                },
                {
                    "id": "alg-easy", "subject": "Algebra", "difficulty": "easy",
                    "estimated_minutes": 20
                }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ranked = body["recommendations"].as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["id"], "alg-easy");
    assert!((ranked[0]["score"].as_f64().unwrap() - 0.8).abs() < 1e-9);
    assert_eq!(ranked[1]["id"], "geo-hard");
    assert!(ranked[0]["relevance_factors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f.as_str().unwrap().contains("weak area")));

    assert_eq!(body["profile"]["preferred_difficulty"], "easy");
    assert_eq!(body["profile"]["weak_areas"], json!(["algebra"]));
}

#[tokio::test]
async fn test_content_from_stored_catalogue() {
    let store = seeded_store();
    store.insert_candidates(vec![
        row(json!({
            "_id": "mat-1",
            "filename": "algebra-basics.pdf",
            "word_count": 2000,
            "ai_analysis": {
                "subject_category": "Algebra",
                "difficulty_level": "easy",
                "key_topics": ["linear equations"]
            }
        })),
        row(json!({
            "_id": "quiz-1", "title": "Long geometry quiz", "topic": "geometry",
            "question_count": 30
        })),
    ]);
    store.set_preferences(LEARNER, row(json!({ "learning_style": "visual" })));
    let app = common::create_test_app(store, ScriptedProvider::unreachable());

    let (status, body) = post_json(
        &app,
        "/api/v1/recommendations/content",
        json!({ "user_id": LEARNER }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ranked = body["recommendations"].as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["id"], "mat-1");
    assert_eq!(ranked[0]["kind"], "material");
    assert_eq!(ranked[0]["estimated_minutes"], 10);
    assert_eq!(ranked[1]["estimated_minutes"], 60);
    assert_eq!(body["profile"]["learning_style"], "visual");
}

#[tokio::test]
async fn test_content_request_limits() {
    let app = common::create_test_app(seeded_store(), ScriptedProvider::unreachable());

    let too_many: Vec<_> = (0..201)
        .map(|i| json!({ "subject": format!("topic-{i}") }))
        .collect();
    let (status, _) = post_json(
        &app,
        "/api/v1/recommendations/content",
        json!({ "user_id": LEARNER, "candidates": too_many }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/api/v1/recommendations/content",
        json!({ "user_id": LEARNER, "candidates": [{ "subject": "" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        &app,
        "/api/v1/recommendations/content",
        json!({ "user_id": LEARNER, "candidates": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommendations"], json!([]));
}

#[tokio::test]
async fn test_learning_path_from_model() {
    let provider = ScriptedProvider::new(vec![(
        PATH_PROMPT,
        Ok(json!({
            "title": "Algebra comeback",
            "description": "Two weeks of focused practice",
            "steps": [
                { "topic": "linear equations", "difficulty": "easy", "estimated_minutes": 40,
                  "activities": ["Worked examples", "Short quiz"] },
                { "topic": "quadratics", "difficulty": "medium", "estimated_minutes": 50 }
            ]
        })
        .to_string()),
    )]);
    let app = common::create_test_app(seeded_store(), provider);

    let (status, body) = post_json(
        &app,
        "/api/v1/recommendations/learning-path",
        json!({ "user_id": LEARNER, "goal": "Pass the algebra exam", "time_available_days": 14 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provenance"], "ai");
    assert_eq!(body["title"], "Algebra comeback");
    assert_eq!(body["steps"].as_array().unwrap().len(), 2);
    assert_eq!(body["steps"][1]["order"], 2);
    assert_eq!(body["time_available_days"], 14);
}

#[tokio::test]
async fn test_learning_path_template_fallback() {
    let provider = ScriptedProvider::new(vec![(
        PATH_PROMPT,
        Ok(r#"{"title": "Empty", "steps": []}"#.to_string()),
    )]);
    let app = common::create_test_app(seeded_store(), provider);

    let (status, body) = post_json(
        &app,
        "/api/v1/recommendations/learning-path",
        json!({
            "user_id": LEARNER,
            "goal": "Catch up",
            "focus_areas": ["Fractions", "algebra"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provenance"], "fallback");
    assert_eq!(body["confidence"], 0.6);
    assert_eq!(body["time_available_days"], 30);

    let steps = body["steps"].as_array().unwrap();
    let topics: Vec<&str> = steps.iter().map(|s| s["topic"].as_str().unwrap()).collect();
    assert_eq!(topics, vec!["fractions", "algebra", "geometry"]);
    assert!(steps.iter().all(|s| s["estimated_minutes"] == 30));
    assert_eq!(steps[0]["difficulty"], "easy");
}

#[tokio::test]
async fn test_learning_path_requires_goal() {
    let app = common::create_test_app(seeded_store(), ScriptedProvider::unreachable());

    let (status, body) = post_json(
        &app,
        "/api/v1/recommendations/learning-path",
        json!({ "user_id": LEARNER, "goal": "" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}
