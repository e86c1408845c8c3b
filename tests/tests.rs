// ../tests/tests.rs
use futures::future::BoxFuture;
use gm_ratatui::turn::{CANCELLED_MESSAGE, RESPONSE_MARKER, build_prompt, extract_response};
use gm_ratatui::ui::game;
use gm_ratatui::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const SCENARIO: &str = "You are in a medieval fantasy world. The adventure begins in a small village called Riverdale.";

/// Answers with the prompt echoed back followed by the next scripted reply.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedGenerator {
    fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(format!(" {text}")));
        self
    }

    fn raw(self, decoded: &str) -> Self {
        // Replaces the whole decoded output, prompt echo included.
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(format!("\u{0}{decoded}")));
        self
    }

    fn fail(self, reason: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::Unavailable(reason.to_string())));
        self
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, GatewayError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(" Nothing happens.".to_string()));
            reply.map(|text| match text.strip_prefix('\u{0}') {
                Some(decoded) => decoded.to_string(),
                None => format!("{prompt}{text}"),
            })
        })
    }
}

/// Never finishes, so a turn stays in the generating state.
struct StalledGenerator;

impl TextGenerator for StalledGenerator {
    fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, GatewayError>> {
        Box::pin(futures::future::pending())
    }
}

fn controller_with(
    gateway: ModelGateway,
    window: ContextWindow,
) -> (TurnController, mpsc::UnboundedReceiver<TurnCompletion>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = TurnController::start_session(SCENARIO, window, Arc::new(gateway), tx);
    (controller, rx)
}

async fn play(
    controller: &mut TurnController,
    rx: &mut mpsc::UnboundedReceiver<TurnCompletion>,
    input: &str,
) -> Submission {
    let submission = controller.submit(input);
    if let Submission::Started(_) = submission {
        let completion = rx.recv().await.expect("Expected a turn completion");
        assert!(controller.complete(completion));
    }
    submission
}

fn last_line(controller: &TurnController) -> &transcript::TranscriptLine {
    controller
        .transcript()
        .lines()
        .last()
        .expect("Expected a transcript line")
}

#[test]
fn test_response_is_last_segment_after_marker() {
    let decoded = format!("Scenario\n\nPlayer: hi\n\n{RESPONSE_MARKER}  Welcome, traveller.  ");
    assert_eq!(extract_response(&decoded), "Welcome, traveller.");

    let twice = format!("{RESPONSE_MARKER} first {RESPONSE_MARKER} second\n");
    assert_eq!(extract_response(&twice), "second");
}

#[test]
fn test_response_without_marker_is_whole_decoded_text() {
    let decoded = "Player: hi\nGame Master: no marker anywhere";
    assert_eq!(extract_response(decoded), decoded);
}

#[test]
fn test_prompt_layout() {
    assert_eq!(
        build_prompt("Context", "open the door"),
        "Context\n\nPlayer: open the door\n\nAI Game Master:"
    );
}

#[test]
fn test_context_skips_system_lines_and_honours_window() {
    let mut transcript = Transcript::new("Scenario");
    transcript.append(Speaker::System, "Model loaded successfully.");
    transcript.append(Speaker::Player, "one");
    transcript.append(Speaker::GameMaster, "two");
    transcript.append(Speaker::SystemError, "boom");
    transcript.append(Speaker::Player, "three");
    transcript.append(Speaker::GameMaster, "four");

    assert_eq!(
        transcript.context(ContextWindow::Unbounded),
        "Scenario\nPlayer: one\nGame Master: two\nPlayer: three\nGame Master: four"
    );
    assert_eq!(
        transcript.context(ContextWindow::LastLines(2)),
        "Scenario\nPlayer: three\nGame Master: four"
    );
    assert_eq!(transcript.context(ContextWindow::LastLines(0)), "Scenario");
    assert_eq!(transcript.line_count(), 7);
}

#[tokio::test]
async fn test_session_starts_with_scenario_and_model_status() {
    let (controller, _rx) = controller_with(
        ModelGateway::with_generator(ScriptedGenerator::default()),
        ContextWindow::Unbounded,
    );
    assert_eq!(controller.transcript().scenario(), SCENARIO);
    assert_eq!(last_line(&controller).speaker, Speaker::System);
    assert_eq!(last_line(&controller).text, "Model loaded successfully.");
    assert_eq!(controller.state(), TurnState::Idle);

    let (controller, _rx) = controller_with(
        ModelGateway::unavailable("Failed to load model: connection refused"),
        ContextWindow::Unbounded,
    );
    assert_eq!(last_line(&controller).speaker, Speaker::SystemError);
    assert_eq!(
        last_line(&controller).to_string(),
        "System Error: Failed to load model: connection refused"
    );
}

#[tokio::test]
async fn test_turns_build_prompt_from_running_context() {
    let generator = ScriptedGenerator::default()
        .reply("You see a well.")
        .reply("The water is cold.");
    let prompts = generator.prompts.clone();
    let (mut controller, mut rx) =
        controller_with(ModelGateway::with_generator(generator), ContextWindow::Unbounded);

    play(&mut controller, &mut rx, "look around").await;
    assert_eq!(last_line(&controller).speaker, Speaker::GameMaster);
    assert_eq!(last_line(&controller).text, "You see a well.");

    play(&mut controller, &mut rx, "drink").await;
    assert_eq!(last_line(&controller).text, "The water is cold.");

    let prompts = prompts.lock().unwrap();
    assert_eq!(
        prompts[0],
        format!("{SCENARIO}\n\nPlayer: look around\n\nAI Game Master:")
    );
    assert_eq!(
        prompts[1],
        format!(
            "{SCENARIO}\nPlayer: look around\nGame Master: You see a well.\n\nPlayer: drink\n\nAI Game Master:"
        )
    );
}

#[tokio::test]
async fn test_empty_input_is_ignored() {
    let generator = ScriptedGenerator::default();
    let calls = generator.calls.clone();
    let (mut controller, _rx) =
        controller_with(ModelGateway::with_generator(generator), ContextWindow::Unbounded);
    let before = controller.transcript().clone();

    assert_eq!(controller.submit(""), Submission::Ignored);
    assert_eq!(controller.transcript(), &before);
    assert_eq!(controller.state(), TurnState::Idle);
    tokio::task::yield_now().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_marker_shows_full_decoded_text() {
    let generator = ScriptedGenerator::default().raw("The model rambled without any marker.");
    let (mut controller, mut rx) =
        controller_with(ModelGateway::with_generator(generator), ContextWindow::Unbounded);

    play(&mut controller, &mut rx, "hello").await;
    assert_eq!(
        last_line(&controller).text,
        "The model rambled without any marker."
    );
}

#[tokio::test]
async fn test_failed_generation_keeps_player_line() {
    let generator = ScriptedGenerator::default().fail("server went away");
    let (mut controller, mut rx) =
        controller_with(ModelGateway::with_generator(generator), ContextWindow::Unbounded);

    play(&mut controller, &mut rx, "attack the troll").await;

    let lines = controller.transcript().lines();
    let player = &lines[lines.len() - 2];
    assert_eq!(player.speaker, Speaker::Player);
    assert_eq!(player.text, "attack the troll");
    assert_eq!(last_line(&controller).speaker, Speaker::SystemError);
    assert!(last_line(&controller).text.contains("server went away"));
    assert!(
        !lines.iter().any(|line| line.speaker == Speaker::GameMaster),
        "A failed turn must not produce a Game Master line"
    );
    assert_eq!(controller.state(), TurnState::Idle);
}

#[tokio::test]
async fn test_failed_input_is_not_resent() {
    let generator = ScriptedGenerator::default().fail("boom").reply("ok");
    let prompts = generator.prompts.clone();
    let (mut controller, mut rx) =
        controller_with(ModelGateway::with_generator(generator), ContextWindow::Unbounded);

    play(&mut controller, &mut rx, "attack").await;
    play(&mut controller, &mut rx, "flee").await;

    // Still on screen, never in a prompt again.
    assert!(
        controller
            .transcript()
            .lines()
            .iter()
            .any(|line| line.speaker == Speaker::Player && line.text == "attack")
    );
    let prompts = prompts.lock().unwrap();
    assert_eq!(
        prompts[1],
        format!("{SCENARIO}\n\nPlayer: flee\n\nAI Game Master:")
    );
    assert_eq!(
        controller.transcript().context(ContextWindow::Unbounded),
        format!("{SCENARIO}\nPlayer: flee\nGame Master: ok")
    );
}

#[tokio::test]
async fn test_cancelled_input_is_not_resent() {
    let (mut controller, mut rx) =
        controller_with(ModelGateway::with_generator(StalledGenerator), ContextWindow::Unbounded);

    controller.submit("wait");
    controller.cancel();
    let completion = rx.recv().await.expect("Expected a cancelled completion");
    controller.complete(completion);

    assert_eq!(controller.transcript().context(ContextWindow::Unbounded), SCENARIO);
}

#[tokio::test]
async fn test_resumed_session_continues_saved_dialogue() {
    let history = vec![
        TranscriptLine {
            speaker: Speaker::Player,
            text: "enter the inn".to_string(),
        },
        TranscriptLine {
            speaker: Speaker::GameMaster,
            text: "The innkeeper waves.".to_string(),
        },
        TranscriptLine {
            speaker: Speaker::System,
            text: "Model loaded successfully.".to_string(),
        },
    ];
    let generator = ScriptedGenerator::default().reply("He pours you an ale.");
    let prompts = generator.prompts.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = TurnController::resume_session(
        SCENARIO,
        history,
        ContextWindow::Unbounded,
        Arc::new(ModelGateway::with_generator(generator)),
        tx,
    );

    // Saved system lines are dropped, the fresh status comes last.
    let lines = controller.transcript().lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2].text, "Model loaded successfully.");

    play(&mut controller, &mut rx, "order a drink").await;
    assert_eq!(
        prompts.lock().unwrap()[0],
        format!(
            "{SCENARIO}\nPlayer: enter the inn\nGame Master: The innkeeper waves.\n\nPlayer: order a drink\n\nAI Game Master:"
        )
    );
    assert_eq!(controller.transcript().history().len(), 4);
}

#[test]
fn test_scroll_top_saturates() {
    assert_eq!(game::scroll_top(10, 20, 0), 0);
    assert_eq!(game::scroll_top(100, 20, 0), 80);
    assert_eq!(game::scroll_top(100, 20, 500), 0);
    assert_eq!(game::scroll_top(200_000, 20, 0), u16::MAX);
    assert_eq!(game::scroll_top(200_000, 20, 199_900), 80);
}

#[tokio::test]
async fn test_unavailable_model_reports_every_turn() {
    let (mut controller, mut rx) = controller_with(
        ModelGateway::unavailable("Failed to load model: no such model"),
        ContextWindow::Unbounded,
    );

    play(&mut controller, &mut rx, "hello").await;
    play(&mut controller, &mut rx, "anyone?").await;

    let errors = controller
        .transcript()
        .lines()
        .iter()
        .filter(|line| line.speaker == Speaker::SystemError)
        .count();
    assert_eq!(errors, 3);
}

#[tokio::test]
async fn test_transcript_never_shrinks() {
    let generator = ScriptedGenerator::default()
        .reply("one")
        .fail("hiccup")
        .raw("no marker")
        .reply("four");
    let (mut controller, mut rx) =
        controller_with(ModelGateway::with_generator(generator), ContextWindow::LastLines(2));

    let mut previous = controller.transcript().line_count();
    for input in ["a", "", "b", "c", "", "d", "e"] {
        play(&mut controller, &mut rx, input).await;
        let count = controller.transcript().line_count();
        assert!(count >= previous, "Transcript shrank from {previous} to {count}");
        previous = count;
    }
}

#[tokio::test]
async fn test_generation_can_be_cancelled() {
    let (mut controller, mut rx) =
        controller_with(ModelGateway::with_generator(StalledGenerator), ContextWindow::Unbounded);

    assert!(matches!(controller.submit("wait"), Submission::Started(1)));
    assert!(controller.is_generating());
    assert_eq!(controller.submit("again"), Submission::Busy);

    assert!(controller.cancel());
    let completion = rx.recv().await.expect("Expected a cancelled completion");
    assert!(matches!(completion.outcome, TurnOutcome::Cancelled));
    assert!(controller.complete(completion));

    assert_eq!(controller.state(), TurnState::Idle);
    assert_eq!(last_line(&controller).text, CANCELLED_MESSAGE);
    assert!(!controller.cancel());
}

#[tokio::test]
async fn test_stale_completion_is_dropped() {
    let (mut controller, _rx) = controller_with(
        ModelGateway::with_generator(ScriptedGenerator::default()),
        ContextWindow::Unbounded,
    );
    let before = controller.transcript().line_count();

    let applied = controller.complete(TurnCompletion {
        turn: 42,
        outcome: TurnOutcome::Generated("AI Game Master: ghost".to_string()),
    });
    assert!(!applied);
    assert_eq!(controller.transcript().line_count(), before);
}

#[test]
fn test_settings_defaults_and_round_trip() {
    let dir = tempfile::tempdir().expect("Expected a temp dir");
    let path = dir.path().join("settings.json");

    std::fs::write(&path, r#"{"debug_mode": true, "context_window": {"kind": "LastLines", "lines": 4}}"#)
        .expect("Expected to write settings");
    let settings = Settings::load_settings_from_file(&path).expect("Expected settings");
    assert!(settings.debug_mode);
    assert_eq!(settings.context_window, ContextWindow::LastLines(4));
    assert_eq!(settings.scenario, SCENARIO);
    assert_eq!(settings.endpoint, settings::DEFAULT_ENDPOINT);

    let nested = dir.path().join("nested").join("settings.json");
    settings.save_to_file(&nested).expect("Expected to save settings");
    let reloaded = Settings::load_settings_from_file(&nested).expect("Expected settings");
    assert_eq!(reloaded, settings);
}

#[test]
fn test_missing_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().expect("Expected a temp dir");
    let (settings, error) = Settings::load_or_default(dir.path().join("absent.json"));
    assert_eq!(settings, Settings::default());
    assert!(error.is_some());

    let path = dir.path().join("settings.json");
    Settings::default()
        .save_to_file(&path)
        .expect("Expected to save settings");
    let (_, error) = Settings::load_or_default(&path);
    assert!(error.is_none());
}
