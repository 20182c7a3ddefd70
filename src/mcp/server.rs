//! Nutrieval MCP Server Implementation
//!
//! Implements the MCP server with all nutrition and evaluation tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::catalog::NutritionCatalog;
use crate::db::Database;
use crate::evaluation::{Evaluator, Submission};
use crate::models::{
    DetectedFood, DetectedFoodInput, GroundTruthFood, NutrientTotals, NutritionProfile, Per100g,
};
use crate::tools::benchmarks::{self, AddBenchmarkItemInput};
use crate::tools::evaluations;
use crate::tools::nutrition::{self, MealItemInput};
use crate::tools::reports;
use crate::tools::status::StatusTracker;

/// Nutrieval MCP Service
#[derive(Clone)]
pub struct NutrievalService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    catalog: Arc<dyn NutritionCatalog>,
    evaluator: Evaluator,
    tool_router: ToolRouter<NutrievalService>,
}

impl NutrievalService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        catalog: Arc<dyn NutritionCatalog>,
        catalog_configured: bool,
    ) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                database_path,
                catalog_configured,
            ))),
            database,
            evaluator: Evaluator::new(Arc::clone(&catalog)),
            catalog,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Shared Parameter Types
// ============================================================================

/// Nutrition values; per 100g wherever a reference profile is expected
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct NutritionParam {
    /// Calories (kcal)
    pub calories: f64,
    /// Protein (g)
    pub protein: f64,
    /// Carbohydrates (g)
    pub carbs: f64,
    /// Fat (g)
    pub fat: f64,
    /// Fiber (g)
    pub fiber: Option<f64>,
    /// Sugar (g)
    pub sugar: Option<f64>,
    /// Sodium (mg)
    pub sodium: Option<f64>,
}

impl From<NutritionParam> for NutritionProfile {
    fn from(p: NutritionParam) -> Self {
        Self {
            calories: p.calories,
            protein: p.protein,
            carbs: p.carbs,
            fat: p.fat,
            fiber: p.fiber,
            sugar: p.sugar,
            sodium: p.sodium,
        }
    }
}

/// A food reported by the vision model
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct DetectedFoodParam {
    /// Food name as detected
    pub name: String,
    /// Quantity in the given unit
    pub quantity: f64,
    /// Unit (g, cup, tbsp, slice, medium, ...). Omit to guess from the name.
    pub unit: Option<String>,
    /// Detection confidence 0-1 (default 1.0)
    pub confidence: Option<f64>,
    /// Per-100g nutrition, if already known. Otherwise looked up in the catalog.
    pub nutrition: Option<NutritionParam>,
}

impl From<DetectedFoodParam> for DetectedFood {
    fn from(p: DetectedFoodParam) -> Self {
        DetectedFoodInput {
            name: p.name,
            quantity: p.quantity,
            unit: p.unit,
            confidence: p.confidence.unwrap_or(1.0),
            nutrition: p.nutrition.map(|n| Per100g::new(n.into())),
        }
        .into()
    }
}

/// Detections for one benchmark item, or the error the model hit
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SubmissionParam {
    /// Benchmark item ID
    pub item_id: String,
    /// Detected foods
    #[serde(default)]
    pub foods: Vec<DetectedFoodParam>,
    /// Upstream error; when set the item is scored as a failure
    pub error: Option<String>,
}

impl From<SubmissionParam> for Submission {
    fn from(p: SubmissionParam) -> Self {
        match p.error {
            Some(error) => Submission::failed(p.item_id, error),
            None => Submission::detected(
                p.item_id,
                p.foods.into_iter().map(DetectedFood::from).collect(),
            ),
        }
    }
}

// ============================================================================
// Nutrition Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertToGramsParams {
    /// Quantity in the given unit
    pub quantity: f64,
    /// Unit name (case-insensitive, plural "s" accepted)
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EstimateGramsParams {
    /// Free-text description, e.g. "2 slices of toast"
    pub description: String,
    /// Number of units described
    pub quantity: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ServingNutritionParams {
    /// Nutrition per 100g
    pub per_100g: NutritionParam,
    /// Quantity in the given unit
    pub quantity: f64,
    /// Unit name
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealItemParam {
    /// Optional food name, echoed back in the breakdown
    pub name: Option<String>,
    pub quantity: f64,
    pub unit: String,
    /// Nutrition per 100g
    pub per_100g: NutritionParam,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealNutritionParams {
    /// Foods in the meal
    pub items: Vec<MealItemParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DailyTotalsParams {
    /// Per-meal totals to add up
    pub meals: Vec<NutritionParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MacroPercentagesParams {
    /// Nutrition totals to split by macronutrient
    pub nutrition: NutritionParam,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LookupFoodParams {
    /// Food name
    pub name: String,
}

// ============================================================================
// Benchmark Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GroundTruthFoodParam {
    /// Food name
    pub name: String,
    /// Labeled quantity
    pub quantity: f64,
    /// Labeled unit
    pub unit: String,
    /// Calories for the labeled quantity
    pub calories: f64,
    /// Protein (g) for the labeled quantity
    pub protein: f64,
    /// Carbohydrates (g) for the labeled quantity
    pub carbs: f64,
    /// Fat (g) for the labeled quantity
    pub fat: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TotalsParam {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddBenchmarkItemParams {
    /// Item ID, chosen by the caller (e.g. "meal-001")
    pub id: String,
    /// Display name
    pub name: String,
    /// Path or URL of the image
    pub image_ref: Option<String>,
    /// Labeled foods
    pub foods: Vec<GroundTruthFoodParam>,
    /// Stored totals; summed from the foods when omitted
    pub totals: Option<TotalsParam>,
    /// Replace an existing item with the same ID
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BenchmarkItemIdParams {
    /// Benchmark item ID
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    /// Maximum results
    pub limit: Option<i64>,
    /// Offset for pagination
    pub offset: Option<i64>,
}

// ============================================================================
// Evaluation Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScoreDetectionParams {
    /// Benchmark item ID
    pub item_id: String,
    /// Detected foods
    pub foods: Vec<DetectedFoodParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RunEvaluationParams {
    /// Label for the run
    pub label: String,
    /// Vision model that produced the detections
    pub model: Option<String>,
    /// One entry per evaluated image
    pub submissions: Vec<SubmissionParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RunIdParams {
    /// Evaluation run ID
    pub id: i64,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutrievalService {
    // --- Status ---

    #[tool(description = "Get the current status of the Nutrieval service including build info, database status, and process information")]
    async fn nutrieval_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        to_json(&tracker.get_status())
    }

    #[tool(description = "Get instructions for adding benchmark items and scoring detections. Call this when unsure how to use the evaluation tools.")]
    fn evaluation_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::EVALUATION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(EVALUATION_INSTRUCTIONS)]))
    }

    // --- Nutrition ---

    #[tool(description = "Convert a quantity and unit to grams. Reports whether the weight is a table conversion or an estimate.")]
    fn convert_to_grams(&self, Parameters(p): Parameters<ConvertToGramsParams>) -> Result<CallToolResult, McpError> {
        to_json(&nutrition::convert_to_grams(p.quantity, &p.unit))
    }

    #[tool(description = "Estimate grams from a free-text serving description when no unit is known")]
    fn estimate_grams(&self, Parameters(p): Parameters<EstimateGramsParams>) -> Result<CallToolResult, McpError> {
        to_json(&nutrition::estimate_grams(&p.description, p.quantity))
    }

    #[tool(description = "Scale per-100g nutrition to a serving given as quantity and unit")]
    fn calculate_serving_nutrition(&self, Parameters(p): Parameters<ServingNutritionParams>) -> Result<CallToolResult, McpError> {
        to_json(&nutrition::calculate_serving_nutrition(p.per_100g.into(), p.quantity, &p.unit))
    }

    #[tool(description = "Total nutrition and macro split for a list of foods with per-100g nutrition")]
    fn calculate_meal_nutrition(&self, Parameters(p): Parameters<MealNutritionParams>) -> Result<CallToolResult, McpError> {
        let items = p
            .items
            .into_iter()
            .map(|i| MealItemInput {
                name: i.name,
                quantity: i.quantity,
                unit: i.unit,
                per_100g: i.per_100g.into(),
            })
            .collect();
        to_json(&nutrition::calculate_meal_nutrition(items))
    }

    #[tool(description = "Add up meal totals into daily totals")]
    fn calculate_daily_totals(&self, Parameters(p): Parameters<DailyTotalsParams>) -> Result<CallToolResult, McpError> {
        let meals: Vec<NutritionProfile> = p.meals.into_iter().map(NutritionProfile::from).collect();
        to_json(&nutrition::calculate_daily_totals(&meals))
    }

    #[tool(description = "Percentage of calories from protein, carbs and fat")]
    fn macro_percentages(&self, Parameters(p): Parameters<MacroPercentagesParams>) -> Result<CallToolResult, McpError> {
        to_json(&nutrition::macro_percentages(&NutritionProfile::from(p.nutrition)))
    }

    #[tool(description = "Look up per-100g nutrition for a food in the catalog. Unknown foods return the placeholder profile.")]
    async fn lookup_food_nutrition(&self, Parameters(p): Parameters<LookupFoodParams>) -> Result<CallToolResult, McpError> {
        let result = nutrition::lookup_food_nutrition(self.catalog.as_ref(), &p.name).await;
        to_json(&result)
    }

    // --- Benchmark Items ---

    #[tool(description = "Add a labeled benchmark item. Totals are checked against the foods.")]
    fn add_benchmark_item(&self, Parameters(p): Parameters<AddBenchmarkItemParams>) -> Result<CallToolResult, McpError> {
        let input = AddBenchmarkItemInput {
            id: p.id,
            name: p.name,
            image_ref: p.image_ref,
            foods: p
                .foods
                .into_iter()
                .map(|f| GroundTruthFood {
                    name: f.name,
                    quantity: f.quantity,
                    unit: f.unit,
                    calories: f.calories,
                    protein: f.protein,
                    carbs: f.carbs,
                    fat: f.fat,
                })
                .collect(),
            totals: p.totals.map(|t| NutrientTotals {
                calories: t.calories,
                protein: t.protein,
                carbs: t.carbs,
                fat: t.fat,
            }),
            replace: p.replace,
        };
        let result = benchmarks::add_benchmark_item(&self.database, input).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a benchmark item with its full ground truth")]
    fn get_benchmark_item(&self, Parameters(p): Parameters<BenchmarkItemIdParams>) -> Result<CallToolResult, McpError> {
        let result = benchmarks::get_benchmark_item(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(item) => to_json(&item),
            None => to_json(&serde_json::json!({"error": "Benchmark item not found", "id": p.id})),
        }
    }

    #[tool(description = "List benchmark items ordered by ID")]
    fn list_benchmark_items(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = benchmarks::list_benchmark_items(&self.database, p.limit, p.offset).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a benchmark item. Stored run results are kept.")]
    fn delete_benchmark_item(&self, Parameters(p): Parameters<BenchmarkItemIdParams>) -> Result<CallToolResult, McpError> {
        let result = benchmarks::delete_benchmark_item(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Evaluation ---

    #[tool(description = "Score detected foods against one benchmark item without storing the result")]
    async fn score_detection(&self, Parameters(p): Parameters<ScoreDetectionParams>) -> Result<CallToolResult, McpError> {
        let submission = Submission::detected(
            p.item_id,
            p.foods.into_iter().map(DetectedFood::from).collect(),
        );
        let result = evaluations::score_detection(&self.database, &self.evaluator, submission)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Score a batch of submissions, store the run and return its aggregated metrics. Failed submissions count with zero scores.")]
    async fn run_evaluation(&self, Parameters(p): Parameters<RunEvaluationParams>) -> Result<CallToolResult, McpError> {
        let submissions: Vec<Submission> = p.submissions.into_iter().map(Submission::from).collect();
        let result = evaluations::run_evaluation(&self.database, &self.evaluator, p.label, p.model, submissions)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a stored evaluation run with its per-item results")]
    fn get_evaluation_run(&self, Parameters(p): Parameters<RunIdParams>) -> Result<CallToolResult, McpError> {
        let result = evaluations::get_evaluation_run(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(detail) => to_json(&detail),
            None => to_json(&serde_json::json!({"error": "Evaluation run not found", "id": p.id})),
        }
    }

    #[tool(description = "List stored evaluation runs, newest first")]
    fn list_evaluation_runs(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = evaluations::list_evaluation_runs(&self.database, p.limit, p.offset).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Export a stored evaluation run as a Markdown report")]
    fn export_evaluation_report(&self, Parameters(p): Parameters<RunIdParams>) -> Result<CallToolResult, McpError> {
        let result = reports::export_evaluation_report(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        Ok(CallToolResult::success(vec![Content::text(result.markdown)]))
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for NutrievalService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutrieval".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Nutrieval".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Nutrieval - Nutrition math and scoring of food detections against labeled meal images. \
                 IMPORTANT: Call evaluation_instructions before scoring. \
                 Nutrition: convert_to_grams, estimate_grams, calculate_serving_nutrition, calculate_meal_nutrition, \
                 calculate_daily_totals, macro_percentages, lookup_food_nutrition. \
                 Benchmarks: add/get/list/delete_benchmark_item. \
                 Evaluation: score_detection, run_evaluation, get_evaluation_run, list_evaluation_runs, export_evaluation_report."
                    .into(),
            ),
        }
    }
}
