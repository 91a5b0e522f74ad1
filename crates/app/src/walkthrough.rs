use std::error::Error;
use std::time::Duration;

use course_core::model::{Answer, Question, QuestionKind};
use services::view::{LoadErrorVm, loading_message, map_progress_overview, map_quiz_result};
use services::{
    ActiveStep, AppServices, CourseFlow, PlayerEvent, QuizAdvance, QuizError, QuizResult,
    QuizSession, ReadingError, ReadingSession, VideoError, VideoSession,
};
use tracing::{debug, info};

const READ_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkthroughOptions {
    /// Answer the first quiz wrongly once, then retake it.
    pub fail_first_quiz: bool,
}

/// Drive a fresh course from the first step to the last, printing what a learner
/// would see.
pub async fn run(services: &AppServices, options: WalkthroughOptions) -> Result<(), Box<dyn Error>> {
    let mut flow = services.new_flow()?;
    let mut fail_next_quiz = options.fail_first_quiz;

    loop {
        let index = flow.store().state().current_step();
        println!("\n{}", loading_message(index));
        let step = match flow.load_current_step().await {
            Ok(step) => step,
            Err(err) => {
                let vm = LoadErrorVm::from(&err);
                println!("{}: {} [{}]", vm.title, vm.message, vm.retry_label);
                flow.retry().await?
            }
        };
        println!("Step {}: {} ({})", index + 1, step.title(), step.kind().as_str());

        match flow.start_step()? {
            ActiveStep::Video(mut video) => watch(&mut flow, &mut video)?,
            ActiveStep::Quiz(mut quiz) => {
                let mut answer_wrongly = std::mem::take(&mut fail_next_quiz);
                loop {
                    let result = take_quiz(&mut flow, &mut quiz, answer_wrongly)?;
                    let vm = map_quiz_result(&result);
                    println!("  {}", vm.headline);
                    println!("  {}", vm.score_line);
                    println!("  {}", vm.detail_line);
                    if result.passed {
                        break;
                    }
                    quiz.retake(flow.now())?;
                    answer_wrongly = false;
                }
            }
            ActiveStep::Reading(mut reading) => read(&mut flow, &mut reading).await?,
        }

        print_overview(&flow);
        if !flow.next_step() {
            break;
        }
    }

    flow.wait_for_prefetch().await;
    info!("course finished");
    Ok(())
}

fn watch(flow: &mut CourseFlow, video: &mut VideoSession) -> Result<(), VideoError> {
    let now = flow.now();
    video.play(now);
    video.on_player_event(
        PlayerEvent::ReadyToPlay {
            duration_secs: Some(f64::from(video.lesson().duration)),
        },
        now,
    );
    println!("  watched {} ({})", video.lesson().video_url, video.duration_label());
    video.complete(flow.store_mut())
}

fn take_quiz(
    flow: &mut CourseFlow,
    quiz: &mut QuizSession,
    answer_wrongly: bool,
) -> Result<QuizResult, QuizError> {
    loop {
        let question = quiz.current_question();
        let answer = if answer_wrongly {
            wrong_answer(question)
        } else {
            question.answer.clone()
        };
        quiz.answer(answer)?;
        quiz.submit_answer();
        debug!(
            question = %quiz.current_question().id,
            correct = ?quiz.feedback(),
            "answered"
        );

        let now = flow.now();
        if let QuizAdvance::Finished(result) = quiz.next(flow.store_mut(), now)? {
            return Ok(result);
        }
    }
}

async fn read(flow: &mut CourseFlow, reading: &mut ReadingSession) -> Result<(), ReadingError> {
    loop {
        while !reading.is_section_read(reading.current_index()) {
            tokio::time::sleep(READ_POLL).await;
        }
        let progress = reading.progress();
        println!("  read section {} of {}", progress.section + 1, progress.total);
        if !reading.next() {
            break;
        }
    }
    reading.complete(flow.store_mut())
}

/// A plausible but incorrect answer of the right shape.
fn wrong_answer(question: &Question) -> Answer {
    match question.kind {
        QuestionKind::Matching => {
            let keys: Vec<&String> = question
                .answer
                .as_pairs()
                .map(|pairs| pairs.keys().collect())
                .unwrap_or_default();
            if keys.is_empty() {
                Answer::pairs([("?", "?")])
            } else {
                Answer::pairs(keys.into_iter().map(|key| (key.clone(), "?".to_owned())))
            }
        }
        QuestionKind::Ordering => {
            let mut items: Vec<String> = question
                .answer
                .as_sequence()
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            items.reverse();
            if items.is_empty() {
                items.push("?".to_owned());
            }
            Answer::sequence(items)
        }
        _ => {
            let canonical = question.answer.to_plain_string().to_lowercase();
            question
                .options
                .iter()
                .find(|option| option.to_lowercase() != canonical)
                .map_or_else(|| Answer::text("?"), |option| Answer::text(option.clone()))
        }
    }
}

fn print_overview(flow: &CourseFlow) {
    let vm = map_progress_overview(flow.store().state());
    println!("  {} | {}", vm.percent_label, vm.step_label);
    for row in &vm.rows {
        println!("    {:<16} {:<8} {}", row.title, row.number_label, row.status_label);
    }
    if let Some(scores) = &vm.quiz_scores_label {
        println!("    quiz scores: {scores}");
    }
}
