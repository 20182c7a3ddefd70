//! Evaluation runner
//!
//! Turns vision-model submissions into scored results. Each detected food is
//! resolved against the nutrition catalog concurrently; lookups that fail fall
//! back to placeholder nutrition and a failed detection becomes an all-zero
//! record with an error annotation, so a batch always completes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use super::metrics::{aggregate_metrics, score_detection};
use crate::catalog::{
    resolve_or_placeholder, NutritionCatalog, Resolution, PLACEHOLDER_PROFILE,
};
use crate::models::{
    BenchmarkItem, DetectedFood, EvaluationMetrics, EvaluationResultCreate, NutritionProfile,
};
use crate::nutrition::{calculate_total_nutrition, ServingEntry};

/// What the vision model produced for one image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionOutcome {
    /// The detection call failed upstream
    Failed { error: String },
    Detected {
        #[serde(default)]
        foods: Vec<DetectedFood>,
    },
}

/// Vision output for one benchmark item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub item_id: String,
    #[serde(flatten)]
    pub outcome: DetectionOutcome,
}

impl Submission {
    pub fn detected(item_id: impl Into<String>, foods: Vec<DetectedFood>) -> Self {
        Self {
            item_id: item_id.into(),
            outcome: DetectionOutcome::Detected { foods },
        }
    }

    pub fn failed(item_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            outcome: DetectionOutcome::Failed {
                error: error.into(),
            },
        }
    }

    /// Detected foods, empty for a failed submission
    fn into_foods(self) -> Vec<DetectedFood> {
        match self.outcome {
            DetectionOutcome::Detected { foods } => foods,
            DetectionOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Scored result for one submission
#[derive(Debug, Clone, Serialize)]
pub struct ItemEvaluation {
    pub item_id: String,
    /// Detected foods with the profiles they were scored with
    pub detected: Vec<DetectedFood>,
    /// How each detected food got its profile, in the same order
    pub resolutions: Vec<Resolution>,
    /// Summed nutrition of the detections, None when the item failed
    pub ai_totals: Option<NutritionProfile>,
    pub metrics: EvaluationMetrics,
    pub error: Option<String>,
}

impl ItemEvaluation {
    fn failed(item_id: String, detected: Vec<DetectedFood>, error: String) -> Self {
        Self {
            item_id,
            detected,
            resolutions: Vec::new(),
            ai_totals: None,
            metrics: EvaluationMetrics::zeroed(),
            error: Some(error),
        }
    }

    /// Number of foods scored with placeholder nutrition
    pub fn placeholder_count(&self) -> usize {
        self.resolutions
            .iter()
            .filter(|r| matches!(r, Resolution::NotFound | Resolution::Failed))
            .count()
    }

    /// Record shape used for persistence
    pub fn to_result_create(&self) -> EvaluationResultCreate {
        EvaluationResultCreate {
            item_id: self.item_id.clone(),
            detected: self.detected.clone(),
            resolutions: self.resolutions.clone(),
            ai_totals: self.ai_totals.map(|t| t.totals()),
            metrics: self.metrics,
            error: self.error.clone(),
        }
    }
}

/// Scored batch
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub items: Vec<ItemEvaluation>,
    pub aggregated: EvaluationMetrics,
    pub failed_count: usize,
}

/// Scores submissions using a nutrition catalog
#[derive(Clone)]
pub struct Evaluator {
    catalog: Arc<dyn NutritionCatalog>,
}

impl Evaluator {
    pub fn new(catalog: Arc<dyn NutritionCatalog>) -> Self {
        Self { catalog }
    }

    /// Give every detected food a profile
    ///
    /// Foods that already carry a profile keep it. The rest are looked up
    /// concurrently; there is no ordering between lookups and one failing
    /// never cancels the others.
    pub async fn resolve_foods(
        &self,
        mut foods: Vec<DetectedFood>,
    ) -> (Vec<DetectedFood>, Vec<Resolution>) {
        let mut resolutions = vec![Resolution::Provided; foods.len()];
        let mut lookups = JoinSet::new();

        for (idx, food) in foods.iter().enumerate() {
            if food.nutrition.is_some() {
                continue;
            }
            let catalog = Arc::clone(&self.catalog);
            let name = food.name.clone();
            lookups.spawn(async move {
                let resolved = resolve_or_placeholder(catalog.as_ref(), &name).await;
                (idx, resolved)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((idx, (profile, resolution))) => {
                    foods[idx].nutrition = Some(profile);
                    resolutions[idx] = resolution;
                }
                Err(e) => tracing::warn!("Nutrition lookup task failed: {}", e),
            }
        }

        // A lookup task that died leaves its food unresolved
        for (food, resolution) in foods.iter_mut().zip(resolutions.iter_mut()) {
            if food.nutrition.is_none() {
                food.nutrition = Some(PLACEHOLDER_PROFILE);
                *resolution = Resolution::Failed;
            }
        }

        (foods, resolutions)
    }

    /// Score one submission against its benchmark item
    pub async fn evaluate_item(
        &self,
        item: &BenchmarkItem,
        submission: Submission,
    ) -> ItemEvaluation {
        let foods = match submission.outcome {
            DetectionOutcome::Failed { error } => {
                tracing::warn!("Detection for '{}' failed upstream: {}", item.id, error);
                return ItemEvaluation::failed(submission.item_id, Vec::new(), error);
            }
            DetectionOutcome::Detected { foods } => foods,
        };

        let (detected, resolutions) = self.resolve_foods(foods).await;

        let entries: Vec<ServingEntry> = detected
            .iter()
            .filter_map(|f| f.nutrition.map(|p| ServingEntry::new(p, f.grams())))
            .collect();
        let ai_totals = calculate_total_nutrition(&entries);
        if !ai_totals.totals().is_finite() {
            let error = "Detected nutrition totals overflow".to_string();
            tracing::warn!("{} for '{}'", error, item.id);
            return ItemEvaluation::failed(submission.item_id, detected, error);
        }

        let metrics = score_detection(&detected, &ai_totals.totals(), &item.ground_truth);

        tracing::debug!(
            "Scored '{}': f1 {:.3}, overall {:.3}",
            item.id,
            metrics.f1_score,
            metrics.overall_score
        );

        ItemEvaluation {
            item_id: submission.item_id,
            detected,
            resolutions,
            ai_totals: Some(ai_totals),
            metrics,
            error: None,
        }
    }

    /// Score a batch of submissions and average the results
    ///
    /// Submissions for unknown items count as failures. Failed items take part
    /// in the average with their all-zero metrics.
    pub async fn evaluate_batch(
        &self,
        items: &[BenchmarkItem],
        submissions: Vec<Submission>,
    ) -> RunReport {
        let by_id: HashMap<&str, &BenchmarkItem> =
            items.iter().map(|i| (i.id.as_str(), i)).collect();

        let mut results = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let evaluation = match by_id.get(submission.item_id.as_str()) {
                Some(item) => self.evaluate_item(item, submission).await,
                None => {
                    let error = format!("Unknown benchmark item '{}'", submission.item_id);
                    tracing::warn!("{}", error);
                    let item_id = submission.item_id.clone();
                    ItemEvaluation::failed(item_id, submission.into_foods(), error)
                }
            };
            results.push(evaluation);
        }

        let metrics: Vec<EvaluationMetrics> = results.iter().map(|r| r.metrics).collect();
        let failed_count = results.iter().filter(|r| r.error.is_some()).count();

        tracing::info!(
            "Evaluated {} submissions ({} failed)",
            results.len(),
            failed_count
        );

        RunReport {
            aggregated: aggregate_metrics(&metrics),
            items: results,
            failed_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::models::{GroundTruth, GroundTruthFood, Per100g};

    fn per100(calories: f64, protein: f64, carbs: f64, fat: f64) -> Per100g {
        Per100g(NutritionProfile {
            calories,
            protein,
            carbs,
            fat,
            ..Default::default()
        })
    }

    fn catalog() -> Arc<dyn NutritionCatalog> {
        Arc::new(
            StaticCatalog::new()
                .with("chicken", per100(165.0, 31.0, 0.0, 3.6))
                .with("rice", per100(130.0, 2.7, 28.0, 0.3)),
        )
    }

    fn item() -> BenchmarkItem {
        BenchmarkItem {
            id: "meal-001".to_string(),
            name: "Chicken and rice".to_string(),
            image_ref: None,
            ground_truth: GroundTruth::from_foods(vec![
                GroundTruthFood {
                    name: "grilled chicken breast".to_string(),
                    quantity: 150.0,
                    unit: "g".to_string(),
                    calories: 247.5,
                    protein: 46.5,
                    carbs: 0.0,
                    fat: 5.4,
                },
                GroundTruthFood {
                    name: "white rice".to_string(),
                    quantity: 1.0,
                    unit: "cup".to_string(),
                    calories: 312.0,
                    protein: 6.5,
                    carbs: 67.2,
                    fat: 0.7,
                },
            ]),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[tokio::test]
    async fn test_perfect_detection() {
        let evaluator = Evaluator::new(catalog());
        let submission = Submission::detected(
            "meal-001",
            vec![
                DetectedFood::new("chicken", 150.0, "g", 0.95),
                DetectedFood::new("rice", 1.0, "cup", 0.9),
            ],
        );
        let result = evaluator.evaluate_item(&item(), submission).await;

        assert!(result.error.is_none());
        assert_eq!(result.resolutions, vec![Resolution::Catalog, Resolution::Catalog]);
        assert_eq!(result.placeholder_count(), 0);
        // 247.5 + 312 = 559.5, rounded to whole calories
        assert!((result.ai_totals.unwrap().calories - 559.5).abs() <= 0.5);
        assert_eq!(result.metrics.f1_score, 1.0);
        assert_eq!(result.metrics.quantity_accuracy, 1.0);
        assert!(result.metrics.calorie_accuracy > 0.99);
        let expected = 0.4 * result.metrics.f1_score
            + 0.3 * result.metrics.quantity_accuracy
            + 0.3 * result.metrics.calorie_accuracy;
        assert!((result.metrics.overall_score - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_unknown_food_uses_placeholder() {
        let evaluator = Evaluator::new(catalog());
        let submission = Submission::detected(
            "meal-001",
            vec![
                DetectedFood::new("chicken", 100.0, "g", 0.9),
                DetectedFood::new("mystery sauce", 2.0, "tbsp", 0.3),
            ],
        );
        let result = evaluator.evaluate_item(&item(), submission).await;

        assert_eq!(result.resolutions[1], Resolution::NotFound);
        assert_eq!(result.detected[1].nutrition, Some(PLACEHOLDER_PROFILE));
        assert_eq!(result.placeholder_count(), 1);
        // 165 + 30g of placeholder (30 kcal) = 195
        assert_eq!(result.ai_totals.unwrap().calories, 195.0);
    }

    #[tokio::test]
    async fn test_provided_nutrition_is_kept() {
        let evaluator = Evaluator::new(catalog());
        let own = per100(200.0, 10.0, 10.0, 10.0);
        let submission = Submission::detected(
            "meal-001",
            vec![DetectedFood::new("chicken", 100.0, "g", 0.9).with_nutrition(own)],
        );
        let result = evaluator.evaluate_item(&item(), submission).await;
        assert_eq!(result.resolutions, vec![Resolution::Provided]);
        assert_eq!(result.ai_totals.unwrap().calories, 200.0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_zeroed() {
        let evaluator = Evaluator::new(catalog());
        let result = evaluator
            .evaluate_item(&item(), Submission::failed("meal-001", "vision model timeout"))
            .await;
        assert_eq!(result.metrics, EvaluationMetrics::zeroed());
        assert_eq!(result.error.as_deref(), Some("vision model timeout"));
        assert!(result.ai_totals.is_none());
    }

    #[tokio::test]
    async fn test_batch_includes_failures_in_mean() {
        let evaluator = Evaluator::new(catalog());
        let report = evaluator
            .evaluate_batch(
                &[item()],
                vec![
                    Submission::detected(
                        "meal-001",
                        vec![
                            DetectedFood::new("chicken", 150.0, "g", 0.95),
                            DetectedFood::new("rice", 1.0, "cup", 0.9),
                        ],
                    ),
                    Submission::failed("meal-001", "rate limited"),
                    Submission::detected(
                        "meal-404",
                        vec![DetectedFood::new("rice", 1.0, "cup", 0.9)],
                    ),
                ],
            )
            .await;

        assert_eq!(report.items.len(), 3);
        assert_eq!(report.failed_count, 2);
        assert!(report.items[2].error.as_deref().unwrap().contains("meal-404"));
        assert!((report.aggregated.f1_score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_submission_from_json() {
        let submissions: Vec<Submission> = serde_json::from_str(
            r#"[
                {"item_id": "meal-001", "foods": [
                    {"name": "rice", "quantity": 1, "unit": "cup", "confidence": 0.9}
                ]},
                {"item_id": "meal-002", "error": "HTTP 500"}
            ]"#,
        )
        .unwrap();
        match &submissions[0].outcome {
            DetectionOutcome::Detected { foods } => assert_eq!(foods[0].grams(), 240.0),
            other => panic!("expected detections, got {:?}", other),
        }
        assert!(matches!(
            &submissions[1].outcome,
            DetectionOutcome::Failed { error } if error == "HTTP 500"
        ));
    }

    #[tokio::test]
    async fn test_overflowing_totals_fail_the_item() {
        let catalog = StaticCatalog::new().with("lard", per100(900.0, 0.0, 0.0, 100.0));
        let evaluator = Evaluator::new(Arc::new(catalog));
        let submission = Submission::detected(
            "meal-001",
            vec![
                DetectedFood::new("lard", 1e307, "g", 0.9),
                DetectedFood::new("lard", 1e307, "g", 0.9),
            ],
        );
        let result = evaluator.evaluate_item(&item(), submission).await;

        assert!(result.error.as_deref().unwrap().contains("overflow"));
        assert!(result.ai_totals.is_none());
        assert_eq!(result.metrics, EvaluationMetrics::zeroed());
        assert_eq!(result.detected.len(), 2);
    }
}
