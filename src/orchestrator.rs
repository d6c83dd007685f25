use crate::api::client::PromptApi;
use crate::core::check::{FailureCause, TestResult, run_check};
use crate::store::SavedPrompt;

pub const DEFAULT_PROBE_TEXT: &str = "Silhouette of a person watching the sunrise from a mountain top";
pub const DEFAULT_MODEL_ID: &str = "gpt-4o";

pub const CHECK_CONNECTIVITY: &str = "API connectivity";
pub const CHECK_MODEL_LISTING: &str = "Model listing";
pub const CHECK_OPTIMIZATION: &str = "Prompt optimization";
pub const CHECK_MODEL_TIPS: &str = "Model tips";
pub const CHECK_MODEL_STRUCTURE: &str = "Model structure";
pub const CHECK_MODEL_INFO: &str = "Model info";
pub const CHECK_MODEL_COMPARISON: &str = "Model comparison";
pub const CHECK_SAVE_RESTORE: &str = "Prompt save/restore";

/// Runs the integration checks against a [`PromptApi`], strictly one after another.
pub struct Orchestrator<A> {
    api: A,
}

impl<A: PromptApi> Orchestrator<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn run_all_tests_with_defaults(&self) -> Vec<TestResult> {
        self.run_all_tests(DEFAULT_PROBE_TEXT, DEFAULT_MODEL_ID).await
    }

    /// Result order: connectivity, listing, then the model checks (only when listing
    /// passed; comparison only when two models exist), then save/restore.
    pub async fn run_all_tests(&self, input_text: &str, model_id: &str) -> Vec<TestResult> {
        let mut results = Vec::new();

        log::info!("🩺 Phase 1: Connectivity");
        results.push(run_check(CHECK_CONNECTIVITY, || self.verify_connectivity()).await);

        let listing = run_check(CHECK_MODEL_LISTING, || self.verify_model_listing()).await;
        let catalogue_ok = listing.success;
        results.push(listing);

        if catalogue_ok {
            log::info!("🧪 Phase 2: Model checks against '{model_id}'");
            results.push(
                run_check(CHECK_OPTIMIZATION, || self.verify_optimization(input_text, model_id)).await,
            );
            results.push(run_check(CHECK_MODEL_TIPS, || self.verify_tips(model_id)).await);
            results.push(run_check(CHECK_MODEL_STRUCTURE, || self.verify_structure(model_id)).await);
            results.push(run_check(CHECK_MODEL_INFO, || self.verify_info(model_id)).await);

            match self.comparison_pair().await {
                Some(pair) => {
                    results.push(run_check(CHECK_MODEL_COMPARISON, || self.verify_comparison(&pair)).await)
                }
                None => log::warn!("   -> Skipping '{CHECK_MODEL_COMPARISON}': fewer than two models"),
            }
        } else {
            log::warn!("   -> Model listing failed, skipping model-specific checks");
        }

        log::info!("💾 Phase 3: Local history");
        results.push(run_check(CHECK_SAVE_RESTORE, || self.verify_save_restore()).await);

        let passed = results.iter().filter(|r| r.success).count();
        log::info!("   -> {passed}/{} checks passed", results.len());
        results
    }

    async fn verify_connectivity(&self) -> Result<(), FailureCause> {
        if !self.api.check_health().await? {
            return Err("API server is not reachable".into());
        }
        Ok(())
    }

    async fn verify_model_listing(&self) -> Result<(), FailureCause> {
        if self.api.get_models().await?.is_empty() {
            return Err("Model list is empty".into());
        }
        Ok(())
    }

    async fn verify_optimization(&self, input_text: &str, model_id: &str) -> Result<(), FailureCause> {
        let response = self.api.optimize_prompt(input_text, model_id).await?;
        if !response.success {
            return Err(response
                .error
                .unwrap_or_else(|| "Prompt optimization failed".to_string())
                .into());
        }
        let prompt = response.optimized_prompt.unwrap_or_default();
        if prompt.trim().is_empty() {
            return Err("Optimized prompt is empty".into());
        }
        Ok(())
    }

    async fn verify_tips(&self, model_id: &str) -> Result<(), FailureCause> {
        if self.api.get_model_tips(model_id).await?.is_empty() {
            return Err(format!("No tips returned for '{model_id}'").into());
        }
        Ok(())
    }

    async fn verify_structure(&self, model_id: &str) -> Result<(), FailureCause> {
        if self.api.get_model_structure(model_id).await?.is_empty() {
            return Err(format!("No prompt structure returned for '{model_id}'").into());
        }
        Ok(())
    }

    async fn verify_info(&self, model_id: &str) -> Result<(), FailureCause> {
        if self.api.get_model_info(model_id).await?.is_empty() {
            return Err(format!("No model info returned for '{model_id}'").into());
        }
        Ok(())
    }

    async fn verify_comparison(&self, model_ids: &[String]) -> Result<(), FailureCause> {
        if self.api.compare_models(model_ids).await?.is_empty() {
            return Err("Model comparison returned nothing".into());
        }
        Ok(())
    }

    /// Fetches the catalogue again and takes the first two ids. A failed fetch counts
    /// as "not enough models" so the run carries on.
    async fn comparison_pair(&self) -> Option<Vec<String>> {
        match self.api.get_models().await {
            Ok(models) if models.len() >= 2 => {
                Some(models.into_iter().take(2).map(|m| m.model_id).collect())
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("   -> Could not re-fetch models for comparison: {e}");
                None
            }
        }
    }

    async fn verify_save_restore(&self) -> Result<(), FailureCause> {
        // Saving into a full history evicts its oldest entry, so keep a copy to put back.
        let snapshot = match self.api.get_saved_prompts() {
            Ok(items) => Some(items),
            Err(e) => {
                log::warn!("   -> Could not snapshot saved prompts: {e}");
                None
            }
        };

        let record = SavedPrompt::new("test-model", "Test Model", "Test input", "Test optimized prompt");
        self.api.save_prompt(&record)?;

        let found = self
            .api
            .get_saved_prompts()
            .map(|saved| saved.iter().any(|p| p.id == record.id));

        self.clean_up_saved(&record.id, snapshot.as_deref());

        if !found? {
            return Err("Saved prompt could not be found".into());
        }
        Ok(())
    }

    /// Best effort: failures here are logged and never affect the check result.
    fn clean_up_saved(&self, id: &str, snapshot: Option<&[SavedPrompt]>) {
        if let Err(e) = self.api.delete_saved_prompt(id) {
            log::warn!("   -> Cleanup of check record {id} failed: {e}");
        }

        let Some(snapshot) = snapshot else { return };
        let intact = matches!(self.api.get_saved_prompts(), Ok(current) if current == snapshot);
        if !intact {
            log::info!("   -> Restoring saved prompts to their state before the check");
            if let Err(e) = self.api.restore_saved_prompts(snapshot) {
                log::warn!("   -> Could not restore saved prompts: {e}");
            }
        }
    }
}
