//! Application state and composition.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::infrastructure::{
    clock::SystemClock,
    email::LogEmailSender,
    openai::OpenAiClient,
    persistence::{connect, ConnectionSettings},
    ports::{ClockPort, DocumentRendererPort, EmailPort, ImageExtractionPort, RepoError},
    queue::{JobRunner, PeriodicScheduler, RunnerConfig, SqliteJobQueue, QUEUE_DEFAULT, QUEUE_GAME},
    queue_workers::{
        GameTurnProcessingWorker, ProcessSubscriptionWorker, QueueGameTurnProcessingWorker,
        SendTurnSheetNotificationEmailWorker,
    },
    renderer::ChromiumRenderer,
    resilient_extraction::ResilientExtractionClient,
    turn_sheet_code::TurnSheetCodec,
};
use crate::queue_types::QueueGameTurnProcessing;
use crate::use_cases::adventure::AdventureGame;
use crate::use_cases::notifications::SendTurnSheetNotification;
use crate::use_cases::subscriptions::ProcessSubscriptionUseCase;
use crate::use_cases::turn_sheets::{
    PrintTurnSheet, ScanTurnSheetUpload, TurnSheetProcessors, TurnSheetServices,
};
use crate::use_cases::turns::{ProcessGameTurn, ScheduleDueTurns};

/// Main application state.
///
/// The pool and queue are process-wide; every use case opens its own
/// transaction per call.
pub struct App {
    pub pool: SqlitePool,
    pub clock: Arc<dyn ClockPort>,
    pub queue: Arc<SqliteJobQueue>,
    pub services: Arc<TurnSheetServices>,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub schedule_due_turns: Arc<ScheduleDueTurns>,
    pub process_game_turn: Arc<ProcessGameTurn>,
    pub process_subscription: Arc<ProcessSubscriptionUseCase>,
    pub send_notification: Arc<SendTurnSheetNotification>,
    pub scan_upload: Arc<ScanTurnSheetUpload>,
    pub print_turn_sheet: Arc<PrintTurnSheet>,
}

impl App {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn ClockPort>,
        renderer: Arc<dyn DocumentRendererPort>,
        extractor: Arc<dyn ImageExtractionPort>,
        email: Arc<dyn EmailPort>,
        codec: TurnSheetCodec,
    ) -> Self {
        let queue = Arc::new(SqliteJobQueue::new(pool.clone(), Arc::clone(&clock)));
        let services = Arc::new(TurnSheetServices::new(renderer, extractor, codec));
        let processors = Arc::new(TurnSheetProcessors::new(Arc::clone(&services)));
        let adventure = Arc::new(AdventureGame::new(Arc::clone(&processors)));

        let use_cases = UseCases {
            schedule_due_turns: Arc::new(ScheduleDueTurns::new(pool.clone(), Arc::clone(&clock))),
            process_game_turn: Arc::new(ProcessGameTurn::new(
                pool.clone(),
                Arc::clone(&clock),
                Arc::clone(&adventure),
            )),
            process_subscription: Arc::new(ProcessSubscriptionUseCase::new(
                pool.clone(),
                Arc::clone(&clock),
                adventure,
            )),
            send_notification: Arc::new(SendTurnSheetNotification::new(
                pool.clone(),
                Arc::clone(&clock),
                email,
            )),
            scan_upload: Arc::new(ScanTurnSheetUpload::new(
                pool.clone(),
                Arc::clone(&clock),
                Arc::clone(&services),
                Arc::clone(&processors),
            )),
            print_turn_sheet: Arc::new(PrintTurnSheet::new(
                pool.clone(),
                Arc::clone(&clock),
                processors,
            )),
        };

        Self {
            pool,
            clock,
            queue,
            services,
            use_cases,
        }
    }

    /// Connect to the database and wire the production adapters.
    pub async fn from_config(config: &EngineConfig) -> Result<Self, RepoError> {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
        let pool = connect(&ConnectionSettings::new(&config.database_url)).await?;

        let openai = OpenAiClient::new(
            &config.openai_base_url,
            &config.openai_api_key,
            &config.openai_model,
        )
        .with_image_config(config.image.clone());
        let extractor = Arc::new(ResilientExtractionClient::new(Arc::new(openai)));
        tracing::info!(
            model = %config.openai_model,
            max_dimension = config.image.max_dimension,
            "Extraction client configured"
        );

        Ok(Self::new(
            pool,
            clock,
            Arc::new(ChromiumRenderer::new(&config.renderer_url)),
            extractor,
            Arc::new(LogEmailSender::new(&config.email_from)),
            TurnSheetCodec::new(&config.turn_sheet_code_key),
        ))
    }

    /// A runner for `config.queue` that knows every job kind.
    pub fn runner(&self, config: RunnerConfig, shutdown: CancellationToken) -> JobRunner {
        let use_cases = &self.use_cases;
        JobRunner::new(Arc::clone(&self.queue), config, shutdown)
            .register(Arc::new(QueueGameTurnProcessingWorker::new(Arc::clone(
                &use_cases.schedule_due_turns,
            ))))
            .register(Arc::new(GameTurnProcessingWorker::new(Arc::clone(
                &use_cases.process_game_turn,
            ))))
            .register(Arc::new(SendTurnSheetNotificationEmailWorker::new(
                Arc::clone(&use_cases.send_notification),
            )))
            .register(Arc::new(ProcessSubscriptionWorker::new(Arc::clone(
                &use_cases.process_subscription,
            ))))
    }

    /// Start both queue runners and the turn scheduler.
    pub fn spawn_workers(
        &self,
        config: &EngineConfig,
        shutdown: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let game = RunnerConfig::new(QUEUE_GAME)
            .with_concurrency(config.game_queue_workers)
            .with_job_timeout(config.job_timeout);
        handles.extend(self.runner(game, shutdown.clone()).spawn());

        let default = RunnerConfig::new(QUEUE_DEFAULT)
            .with_concurrency(config.default_queue_workers)
            .with_job_timeout(config.job_timeout);
        handles.extend(self.runner(default, shutdown.clone()).spawn());

        // Leases older than two job timeouts belong to a worker that died.
        let scheduler = PeriodicScheduler::new(
            Arc::clone(&self.queue),
            config.scheduler_interval,
            config.job_timeout * 2,
            shutdown,
        )
        .with_retention(config.job_retention);
        handles.push(scheduler.spawn::<QueueGameTurnProcessing>());

        handles
    }
}
