//! Scripted sessions: replay a list of screen actions against a controller
//! wired to the in-memory store, the way the real screen's event handlers
//! would drive it.

use crate::sacraments::{
    ListView, MemoryStore, Sacrament, SacramentOverlay, SacramentRecord, SacramentsSchema,
    SacramentsScreen, StoreFault, Workflow,
};
use crate::screen::{ControllerSettings, OverlayKey, ScreenScope};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;

/// Built-in script used by `sacraments-screen demo`.
pub const DEMO_SCRIPT: &str = include_str!("demo.json");

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Open {
        overlay: SacramentOverlay,
    },
    Close {
        overlay: SacramentOverlay,
    },
    CloseAll,
    OpenDetail {
        category: Sacrament,
        id: String,
    },
    OpenEdit {
        category: Sacrament,
        id: String,
    },
    OpenCertificate {
        category: Sacrament,
        id: String,
    },
    OpenEntityHistory {
        id: String,
    },
    /// Mount the list component of a category.
    Mount {
        category: Sacrament,
    },
    Unmount {
        category: Sacrament,
    },
    Mutate {
        category: Sacrament,
        workflow: Workflow,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        person: Option<String>,
        #[serde(default)]
        date: Option<String>,
    },
    Fault {
        category: Sacrament,
        fault: StoreFault,
    },
    ClearFaults {
        category: Sacrament,
    },
    Refresh {
        category: Sacrament,
    },
    RefreshAll,
    SetLoading {
        scope: String,
        busy: bool,
        #[serde(default)]
        label: Option<String>,
    },
    /// Ask whether any busy operation mentions `needle`.
    Query {
        needle: String,
    },
    Reset,
    Snapshot,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Open { .. } => "open",
            Step::Close { .. } => "close",
            Step::CloseAll => "close_all",
            Step::OpenDetail { .. } => "open_detail",
            Step::OpenEdit { .. } => "open_edit",
            Step::OpenCertificate { .. } => "open_certificate",
            Step::OpenEntityHistory { .. } => "open_entity_history",
            Step::Mount { .. } => "mount",
            Step::Unmount { .. } => "unmount",
            Step::Mutate { .. } => "mutate",
            Step::Fault { .. } => "fault",
            Step::ClearFaults { .. } => "clear_faults",
            Step::Refresh { .. } => "refresh",
            Step::RefreshAll => "refresh_all",
            Step::SetLoading { .. } => "set_loading",
            Step::Query { .. } => "query",
            Step::Reset => "reset",
            Step::Snapshot => "snapshot",
        }
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub outcome: Value,
}

pub fn parse_script(text: &str) -> Result<Vec<Step>> {
    serde_json::from_str(text).context("Failed to parse script")
}

/// A controller, its store and the currently mounted list components.
pub struct Session {
    controller: SacramentsScreen,
    store: MemoryStore,
    views: HashMap<Sacrament, ListView>,
}

impl Session {
    pub fn new(settings: ControllerSettings, store: MemoryStore) -> Self {
        Self {
            controller: SacramentsScreen::new(settings),
            store,
            views: HashMap::new(),
        }
    }

    pub fn controller(&self) -> &SacramentsScreen {
        &self.controller
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn view(&self, category: Sacrament) -> Option<&ListView> {
        self.views.get(&category)
    }

    /// Run `steps` in order. A malformed step (unknown record, missing
    /// field) aborts the run; a failed mutation is reported and the run goes
    /// on.
    pub async fn run(&mut self, steps: Vec<Step>) -> Result<Vec<StepReport>> {
        info!("Running script with {} steps", steps.len());
        let mut reports = Vec::with_capacity(steps.len());

        for (index, step) in steps.into_iter().enumerate() {
            let op = step.name();
            let outcome = self
                .apply(step)
                .await
                .with_context(|| format!("Step {} ({}) failed", index + 1, op))?;
            reports.push(StepReport {
                index: index + 1,
                op,
                outcome,
            });
        }
        Ok(reports)
    }

    pub async fn apply(&mut self, step: Step) -> Result<Value> {
        debug!("Applying step: {:?}", step);

        let outcome = match step {
            Step::Open { overlay } => {
                self.controller.modals_mut().open(overlay);
                json!({ "open": true })
            }
            Step::Close { overlay } => {
                self.controller.modals_mut().close(overlay);
                json!({ "open": false })
            }
            Step::CloseAll => {
                self.controller.modals_mut().close_all();
                json!({ "open_overlays": 0 })
            }
            Step::OpenDetail { category, id } => {
                let record = self.record(category, &id)?;
                self.controller.modals_mut().open_detail(record);
                json!({ "selected_record": id })
            }
            Step::OpenEdit { category, id } => {
                let record = self.record(category, &id)?;
                self.controller.modals_mut().open_edit(record);
                json!({ "selected_record": id })
            }
            Step::OpenCertificate { category, id } => {
                let record = self.record(category, &id)?;
                self.controller.modals_mut().open_certificate(record);
                json!({ "selected_record": id })
            }
            Step::OpenEntityHistory { id } => {
                self.controller.modals_mut().open_entity_history(id.clone());
                json!({ "selected_entity_id": id })
            }
            Step::Mount { category } => {
                let view = ListView::mount(
                    self.controller.refresh_registry(),
                    self.store.clone(),
                    category,
                );
                let rows = view.rows().len();
                let remounted = self.views.insert(category, view).is_some();
                json!({ "rows": rows, "remounted": remounted })
            }
            Step::Unmount { category } => match self.views.remove(&category) {
                Some(view) => {
                    view.unmount();
                    json!({ "was_mounted": true })
                }
                None => json!({ "was_mounted": false }),
            },
            Step::Mutate {
                category,
                workflow,
                id,
                person,
                date,
            } => self.mutate(category, workflow, id, person, date).await?,
            Step::Fault { category, fault } => {
                self.store.inject(category, fault);
                json!({ "injected": true })
            }
            Step::ClearFaults { category } => {
                self.store.clear_faults(category);
                json!({ "cleared": true })
            }
            Step::Refresh { category } => {
                let outcome = self.controller.refresh_registry().refresh(category);
                json!({ "outcome": outcome, "rows": self.view_rows(category) })
            }
            Step::RefreshAll => serde_json::to_value(self.controller.refresh_all())?,
            Step::SetLoading { scope, busy, label } => {
                let scope: ScreenScope<SacramentsSchema> = scope.parse()?;
                self.controller.loading().set_loading(scope, busy, label);
                json!({ "busy": self.controller.loading().is_loading(scope) })
            }
            Step::Query { needle } => json!({
                "operation_loading": self.controller.loading().is_operation_loading(&needle),
                "any_loading": self.controller.loading().is_any_loading(),
            }),
            Step::Reset => {
                self.controller.reset();
                json!({ "reset": true })
            }
            Step::Snapshot => serde_json::to_value(self.controller.snapshot())?,
        };
        Ok(outcome)
    }

    async fn mutate(
        &mut self,
        category: Sacrament,
        workflow: Workflow,
        id: Option<String>,
        person: Option<String>,
        date: Option<String>,
    ) -> Result<Value> {
        let store = &self.store;
        let controller = &self.controller;

        let result = match workflow {
            Workflow::Create => {
                let person = person.context("create needs a person")?;
                let date = date.context("create needs a date")?;
                controller
                    .mutate(category, workflow, None, || async move {
                        let record = store.create(category, &person, &date).await?;
                        Ok::<_, anyhow::Error>(json!({ "created": record.id }))
                    })
                    .await
            }
            Workflow::Edit => {
                let id = id.context("edit needs an id")?;
                let mut record = self.record(category, &id)?;
                if let Some(person) = person {
                    record.person = person;
                }
                if let Some(date) = date {
                    record.date = date;
                }
                controller
                    .mutate(category, workflow, Some(id), || async move {
                        let record = store.update(record).await?;
                        Ok::<_, anyhow::Error>(json!({ "updated": record.id }))
                    })
                    .await
            }
            Workflow::Delete => {
                let id = id.context("delete needs an id")?;
                controller
                    .mutate(category, workflow, Some(id.clone()), || async move {
                        store.delete(category, &id).await?;
                        Ok::<_, anyhow::Error>(json!({ "deleted": id }))
                    })
                    .await
            }
            Workflow::Certificate => {
                let id = id.context("certificate needs an id")?;
                controller
                    .mutate(category, workflow, Some(id.clone()), || async move {
                        let number = store.issue_certificate(category, &id).await?;
                        Ok::<_, anyhow::Error>(json!({ "certificate": number }))
                    })
                    .await
            }
            Workflow::Export => {
                controller
                    .mutate(category, workflow, None, || async move {
                        let rows = store.export(category).await?;
                        Ok::<_, anyhow::Error>(json!({ "exported_rows": rows }))
                    })
                    .await
            }
        };

        match result {
            Ok(value) => {
                // A successful form submission closes its form; failures keep it open.
                let finished = match workflow {
                    Workflow::Create => Some(SacramentOverlay::for_category(category)),
                    Workflow::Edit => Some(SacramentOverlay::EDIT),
                    Workflow::Delete => Some(SacramentOverlay::DETAIL),
                    Workflow::Certificate | Workflow::Export => None,
                };
                if let Some(overlay) = finished {
                    self.controller.modals_mut().close(overlay);
                }
                Ok(json!({ "ok": true, "result": value, "rows": self.view_rows(category) }))
            }
            Err(err) => Ok(json!({ "ok": false, "error": format!("{err:#}") })),
        }
    }

    fn record(&self, category: Sacrament, id: &str) -> Result<SacramentRecord> {
        self.store
            .get(category, id)
            .with_context(|| format!("No {} record '{}'", category, id))
    }

    fn view_rows(&self, category: Sacrament) -> Option<usize> {
        self.views.get(&category).map(|view| view.rows().len())
    }
}
