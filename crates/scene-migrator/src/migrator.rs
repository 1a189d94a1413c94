//! The migration traversal
//!
//! Scenes are visited in the order the service lists them, objects in the
//! order they are listed within a scene. Every call is awaited before the
//! next one is issued.

use crate::config::MigratorConfig;
use crate::error::MigrateError;
use crate::report::{FailedUpdate, MigrationEvent, MigrationReport, ProgressReporter};
use scene_api::{HttpSceneApi, SceneApi, Scene, SceneObject};

/// Check if `object` should receive the fallback position
///
/// A missing position always qualifies. An explicit position qualifies only
/// when all three components are exactly zero and `treat_origin_as_unset`
/// is set.
#[inline]
#[must_use]
pub fn needs_fallback(object: &SceneObject, treat_origin_as_unset: bool) -> bool {
    match object.position {
        None => true,
        Some(position) => treat_origin_as_unset && position.is_origin(),
    }
}

/// Rewrites unset object positions across all scenes
#[derive(Debug)]
pub struct Migrator<A> {
    api: A,
    config: MigratorConfig,
}

impl Migrator<HttpSceneApi> {
    /// Validate `config` and create an HTTP-backed migrator
    ///
    /// # Errors
    /// - `MigrateError::Config` if the configuration is invalid
    /// - `MigrateError::Client` if the HTTP client cannot be built
    pub fn connect(config: MigratorConfig) -> Result<Self, MigrateError> {
        config.validate()?;
        let api = HttpSceneApi::new(&config.client_config()).map_err(MigrateError::Client)?;
        Ok(Self::new(api, config))
    }
}

impl<A: SceneApi> Migrator<A> {
    /// Create migrator over any API implementation
    #[inline]
    #[must_use]
    pub fn new(api: A, config: MigratorConfig) -> Self {
        Self { api, config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Get the underlying API
    #[inline]
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Visit every scene and object once
    ///
    /// # Returns
    /// Counts for the run. `updated` counts successful update calls only.
    ///
    /// # Errors
    /// - `MigrateError::ListScenes` if scenes cannot be listed
    /// - `MigrateError::ListSceneObjects` if any scene's objects cannot be
    ///   listed; scenes after it are not visited
    ///
    /// Failed updates are not errors; they are reported and recorded in
    /// [`MigrationReport::failed`].
    pub async fn run(
        &self,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<MigrationReport, MigrateError> {
        tracing::info!(
            base_url = %self.config.base_url,
            fallback = %self.config.fallback_position,
            dry_run = self.config.dry_run,
            "starting migration"
        );
        reporter.on_event(&MigrationEvent::Started {
            dry_run: self.config.dry_run,
        });

        reporter.on_event(&MigrationEvent::FetchingScenes);
        let scenes = self
            .api
            .list_scenes()
            .await
            .map_err(MigrateError::ListScenes)?;
        tracing::info!("listed {} scenes", scenes.len());
        reporter.on_event(&MigrationEvent::ScenesListed {
            count: scenes.len(),
        });

        let mut report = MigrationReport::default();
        for scene in &scenes {
            self.migrate_scene(scene, &mut report, reporter).await?;
        }

        tracing::info!(
            updated = report.updated,
            failed = report.failed.len(),
            skipped = report.skipped,
            pending = report.pending,
            "migration finished"
        );
        reporter.on_event(&MigrationEvent::Finished { report: &report });

        Ok(report)
    }

    async fn migrate_scene(
        &self,
        scene: &Scene,
        report: &mut MigrationReport,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<(), MigrateError> {
        reporter.on_event(&MigrationEvent::SceneStarted { scene });

        let objects = self
            .api
            .list_scene_objects(&scene.id)
            .await
            .map_err(|source| MigrateError::ListSceneObjects {
                scene_id: scene.id.clone(),
                source,
            })?;
        report.scenes_processed += 1;
        tracing::debug!(scene = %scene.id, "listed {} objects", objects.len());
        reporter.on_event(&MigrationEvent::ObjectsListed {
            scene,
            count: objects.len(),
        });

        for object in &objects {
            self.migrate_object(object, report, reporter).await;
        }

        Ok(())
    }

    async fn migrate_object(
        &self,
        object: &SceneObject,
        report: &mut MigrationReport,
        reporter: &mut dyn ProgressReporter,
    ) {
        report.objects_inspected += 1;

        if !needs_fallback(object, self.config.treat_origin_as_unset) {
            tracing::debug!(object = %object.id, "position already set");
            report.skipped += 1;
            reporter.on_event(&MigrationEvent::ObjectSkipped { object });
            return;
        }

        let new_position = self.config.fallback_position;
        reporter.on_event(&MigrationEvent::UpdatingObject {
            object,
            new_position,
        });

        if self.config.dry_run {
            report.pending += 1;
            reporter.on_event(&MigrationEvent::UpdateDeferred { object });
            return;
        }

        match self
            .api
            .update_object_position(&object.id, new_position)
            .await
        {
            Ok(_) => {
                tracing::debug!(object = %object.id, "position updated");
                report.updated += 1;
                reporter.on_event(&MigrationEvent::ObjectUpdated { object });
            }
            Err(error) => {
                tracing::warn!(object = %object.id, error = %error, "update failed");
                reporter.on_event(&MigrationEvent::UpdateFailed {
                    object,
                    error: &error,
                });
                report.failed.push(FailedUpdate {
                    object_id: object.id.clone(),
                    object_name: object.name.clone(),
                    message: error.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ConsoleReporter, NullReporter};
    use async_trait::async_trait;
    use mockall::{mock, Sequence};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use scene_api::{Credential, Method, Position, RequestError, ResourceId, StatusCode};

    mock! {
        Api {}

        #[async_trait]
        impl SceneApi for Api {
            async fn list_scenes(&self) -> Result<Vec<Scene>, RequestError>;
            async fn list_scene_objects(&self, scene_id: &ResourceId) -> Result<Vec<SceneObject>, RequestError>;
            async fn update_object_position(&self, object_id: &ResourceId, position: Position) -> Result<SceneObject, RequestError>;
        }
    }

    const FALLBACK: Position = Position::new(116.397128, 39.908802, 100.0);

    fn config() -> MigratorConfig {
        MigratorConfig::new("http://localhost:5000/api", Credential::new("t"))
            .with_fallback_position(FALLBACK)
    }

    fn scene(id: &str) -> Scene {
        Scene {
            id: ResourceId::new(id),
            name: format!("scene {id}"),
        }
    }

    fn object(id: &str, position: Option<[f64; 3]>) -> SceneObject {
        SceneObject {
            id: ResourceId::new(id),
            name: format!("object {id}"),
            position: position.map(Position::from),
        }
    }

    fn server_error(path: &str) -> RequestError {
        RequestError::Status {
            method: Method::GET,
            url: format!("http://localhost:5000/api/{path}"),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        }
    }

    /// S1 = { a: origin, b: [1, 2, 3] }, S2 = { c: origin }
    fn expect_two_scene_listing(api: &mut MockApi) {
        api.expect_list_scenes()
            .times(1)
            .returning(|| Ok(vec![scene("s1"), scene("s2")]));
        api.expect_list_scene_objects()
            .withf(|id| id.as_str() == "s1")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    object("a", Some([0.0, 0.0, 0.0])),
                    object("b", Some([1.0, 2.0, 3.0])),
                ])
            });
        api.expect_list_scene_objects()
            .withf(|id| id.as_str() == "s2")
            .times(1)
            .returning(|_| Ok(vec![object("c", Some([0.0, 0.0, 0.0]))]));
    }

    #[test]
    fn predicate_origin_and_missing() {
        assert!(needs_fallback(&object("a", Some([0.0, 0.0, 0.0])), true));
        assert!(needs_fallback(&object("a", Some([-0.0, 0.0, 0.0])), true));
        assert!(needs_fallback(&object("a", None), true));
        assert!(!needs_fallback(&object("a", Some([0.0, 0.0, 0.001])), true));
        assert!(!needs_fallback(&object("a", Some([1.0, 2.0, 3.0])), true));
    }

    #[test]
    fn predicate_keeping_explicit_origin() {
        assert!(!needs_fallback(&object("a", Some([0.0, 0.0, 0.0])), false));
        assert!(needs_fallback(&object("a", None), false));
    }

    proptest! {
        #[test]
        fn prop_nonzero_component_never_qualifies(
            x in -1e3f64..1e3,
            y in -1e3f64..1e3,
            z in prop::num::f64::NORMAL,
        ) {
            prop_assert!(!needs_fallback(&object("a", Some([x, y, z])), true));
        }
    }

    #[tokio::test]
    async fn updates_only_origin_objects() {
        let mut api = MockApi::new();
        expect_two_scene_listing(&mut api);
        api.expect_update_object_position()
            .withf(|id, position| {
                matches!(id.as_str(), "a" | "c") && *position == FALLBACK
            })
            .times(2)
            .returning(|id, position| {
                Ok(SceneObject {
                    id: id.clone(),
                    name: "updated".to_string(),
                    position: Some(position),
                })
            });

        let migrator = Migrator::new(api, config());
        let report = migrator.run(&mut NullReporter).await.unwrap();

        assert_eq!(report.updated, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.objects_inspected, 3);
        assert_eq!(report.scenes_processed, 2);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn failed_update_is_isolated() {
        let mut api = MockApi::new();
        expect_two_scene_listing(&mut api);
        api.expect_update_object_position()
            .withf(|id, _| id.as_str() == "a")
            .times(1)
            .returning(|_, _| Err(server_error("sceneobjects/a")));
        api.expect_update_object_position()
            .withf(|id, _| id.as_str() == "c")
            .times(1)
            .returning(|id, position| {
                Ok(SceneObject {
                    id: id.clone(),
                    name: "c".to_string(),
                    position: Some(position),
                })
            });

        let migrator = Migrator::new(api, config());
        let report = migrator.run(&mut NullReporter).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].object_id, ResourceId::new("a"));
        assert!(report.failed[0].message.contains("500"));
    }

    #[tokio::test]
    async fn scene_listing_failure_aborts() {
        let mut api = MockApi::new();
        api.expect_list_scenes()
            .times(1)
            .returning(|| Err(server_error("scenes")));
        api.expect_list_scene_objects().never();
        api.expect_update_object_position().never();

        let migrator = Migrator::new(api, config());
        let err = migrator.run(&mut NullReporter).await.unwrap_err();

        assert!(matches!(err, MigrateError::ListScenes(_)));
    }

    #[tokio::test]
    async fn object_listing_failure_stops_later_scenes() {
        let mut api = MockApi::new();
        let mut seq = Sequence::new();
        api.expect_list_scenes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![scene("s1"), scene("s2"), scene("s3")]));
        api.expect_list_scene_objects()
            .withf(|id| id.as_str() == "s1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![object("a", Some([0.0, 0.0, 0.0]))]));
        api.expect_update_object_position()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, position| {
                Ok(SceneObject {
                    id: id.clone(),
                    name: "a".to_string(),
                    position: Some(position),
                })
            });
        api.expect_list_scene_objects()
            .withf(|id| id.as_str() == "s2")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(server_error("sceneobjects/scene/s2")));
        api.expect_list_scene_objects()
            .withf(|id| id.as_str() == "s3")
            .never();

        let migrator = Migrator::new(api, config());
        let err = migrator.run(&mut NullReporter).await.unwrap_err();

        match err {
            MigrateError::ListSceneObjects { scene_id, source } => {
                assert_eq!(scene_id, ResourceId::new("s2"));
                assert!(source.is_status(StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dry_run_issues_no_updates() {
        let mut api = MockApi::new();
        expect_two_scene_listing(&mut api);
        api.expect_update_object_position().never();

        let migrator = Migrator::new(api, config().with_dry_run(true));
        let report = migrator.run(&mut NullReporter).await.unwrap();

        assert_eq!(report.updated, 0);
        assert_eq!(report.pending, 2);
        assert_eq!(report.qualifying(), 2);
    }

    #[tokio::test]
    async fn explicit_origin_kept_when_policy_disabled() {
        let mut api = MockApi::new();
        api.expect_list_scenes()
            .returning(|| Ok(vec![scene("s1")]));
        api.expect_list_scene_objects().returning(|_| {
            Ok(vec![
                object("a", Some([0.0, 0.0, 0.0])),
                object("d", None),
            ])
        });
        api.expect_update_object_position()
            .withf(|id, _| id.as_str() == "d")
            .times(1)
            .returning(|id, position| {
                Ok(SceneObject {
                    id: id.clone(),
                    name: "d".to_string(),
                    position: Some(position),
                })
            });

        let migrator = Migrator::new(api, config().with_treat_origin_as_unset(false));
        let report = migrator.run(&mut NullReporter).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn empty_service_reports_zero() {
        let mut api = MockApi::new();
        api.expect_list_scenes().times(1).returning(|| Ok(Vec::new()));

        let migrator = Migrator::new(api, config());
        let report = migrator.run(&mut NullReporter).await.unwrap();

        assert_eq!(report, MigrationReport::default());
    }

    #[tokio::test]
    async fn console_output_for_failed_update() {
        let mut api = MockApi::new();
        api.expect_list_scenes().returning(|| Ok(vec![scene("s1")]));
        api.expect_list_scene_objects()
            .returning(|_| Ok(vec![object("a", Some([0.0, 0.0, 0.0]))]));
        api.expect_update_object_position()
            .returning(|_, _| Err(server_error("sceneobjects/a")));

        let migrator = Migrator::new(api, config());
        let mut reporter = ConsoleReporter::new(Vec::new());
        migrator.run(&mut reporter).await.unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        assert!(text.contains("Found 1 scenes"));
        assert!(text.contains("Processing scene: scene s1 (s1)"));
        assert!(text.contains("    ✗ Update failed: GET http://localhost:5000/api/sceneobjects/a failed with status 500"));
        assert!(text.contains("Migration complete! Updated 0 objects"));
    }

    #[test]
    fn connect_validates_config() {
        let config = MigratorConfig::new("http://localhost:5000/api", Credential::new(""));
        assert!(matches!(
            Migrator::connect(config),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn connect_keeps_config_and_base_url() {
        let config = config().with_dry_run(true);
        let migrator = Migrator::connect(config).unwrap();
        assert!(migrator.config().dry_run);
        assert_eq!(migrator.config().fallback_position, FALLBACK);
        assert_eq!(
            migrator.api().base_url().as_str(),
            "http://localhost:5000/api"
        );
    }

    #[test]
    fn connect_rejects_bad_url() {
        let config = MigratorConfig::new("not a url", Credential::new("t"));
        assert!(matches!(
            Migrator::connect(config),
            Err(MigrateError::Client(RequestError::InvalidBaseUrl { .. }))
        ));
    }
}
