use std::collections::{BTreeMap, HashMap};

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::editions::Edition;
use crate::quiz::Result;
use crate::store::{AnswerRow, Question, QuestionOption, QuizStore};

/// Placeholder shown when a side has no renderable answer. The card never
/// renders blank.
const EMPTY_ANSWER: &str = "\u{2014}";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ResultsState {
    /// No active session.
    RedirectLogin,
    /// The current user has no completion row; the results view is only
    /// reachable after completion, so send them back to the quiz.
    RedirectQuiz,
    /// The counterpart has not completed yet.
    Waiting,
    /// Both participants completed; comparison is final.
    Revealed(Vec<ComparisonCard>),
}

/// One order-number group: the paired questions' shared position, the
/// question shown on the card, both sides' rendered answers, and whether
/// they match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ComparisonCard {
    pub order_num: i32,
    pub title: String,
    pub scenario: String,
    pub intensity: String,
    pub intensity_emoji: String,
    pub mine: String,
    pub theirs: String,
    pub matched: bool,
}

/// Single aggregation pass: completion gate, then the full comparison.
/// Each poll tick runs exactly this; reads are idempotent, so overlapping
/// ticks are harmless.
pub async fn fetch_results(
    store: &dyn QuizStore,
    identity: &dyn IdentityProvider,
) -> Result<ResultsState> {
    let user = match identity.current_user().await? {
        Some(user) => user,
        None => return Ok(ResultsState::RedirectLogin),
    };

    let completions = store.completions().await?;
    let mine_complete = completions.iter().any(|c| c.user_id == user.id);
    if !mine_complete {
        warn!("User {} reached results without a completion row", user.id);
        return Ok(ResultsState::RedirectQuiz);
    }

    let other_complete = completions.iter().any(|c| c.user_id != user.id);
    if !other_complete {
        return Ok(ResultsState::Waiting);
    }

    let questions = store.all_questions().await?;
    let options = store.all_options().await?;
    let answers = store.visible_answers().await?;

    let options_by_id: HashMap<Uuid, QuestionOption> =
        options.into_iter().map(|o| (o.id, o)).collect();

    let mut my_answers: HashMap<Uuid, AnswerRow> = HashMap::new();
    let mut other_answers: HashMap<Uuid, AnswerRow> = HashMap::new();
    for answer in answers {
        if answer.user_id == user.id {
            my_answers.insert(answer.question_id, answer);
        } else {
            other_answers.insert(answer.question_id, answer);
        }
    }

    Ok(ResultsState::Revealed(build_cards(
        &questions,
        &options_by_id,
        &my_answers,
        &other_answers,
    )))
}

/// Groups questions from both editions by order number and pairs each
/// side's answer against the counterpart's.
pub fn build_cards(
    questions: &[Question],
    options_by_id: &HashMap<Uuid, QuestionOption>,
    my_answers: &HashMap<Uuid, AnswerRow>,
    other_answers: &HashMap<Uuid, AnswerRow>,
) -> Vec<ComparisonCard> {
    let mut by_order: BTreeMap<i32, Vec<&Question>> = BTreeMap::new();
    for question in questions {
        by_order.entry(question.order_num).or_default().push(question);
    }

    let mut cards = Vec::new();
    for (order_num, pair) in by_order {
        // A user only ever has an answer for their own edition's question
        // at this order number, so look the answer up per side.
        let mine = pair.iter().find_map(|q| my_answers.get(&q.id));
        let theirs = pair.iter().find_map(|q| other_answers.get(&q.id));

        // The card shows whichever question exists, "her" edition first.
        let display = pair
            .iter()
            .find(|q| q.edition == Edition::Her)
            .or_else(|| pair.first())
            .copied();
        let Some(display) = display else { continue };

        cards.push(ComparisonCard {
            order_num,
            title: display.title.clone(),
            scenario: display.scenario.clone(),
            intensity: display.intensity.clone(),
            intensity_emoji: display.intensity_emoji.clone(),
            mine: answer_text(mine, options_by_id),
            theirs: answer_text(theirs, options_by_id),
            matched: answers_match(mine, theirs, options_by_id),
        });
    }
    cards
}

/// Display text for one side: "label: option text" for a selected option,
/// "Other: text" for free text ("Other" alone when the text is empty),
/// otherwise the explicit empty marker.
pub fn answer_text(
    answer: Option<&AnswerRow>,
    options_by_id: &HashMap<Uuid, QuestionOption>,
) -> String {
    let Some(answer) = answer else {
        return EMPTY_ANSWER.to_string();
    };
    if let Some(option) = answer
        .selected_option_id
        .and_then(|id| options_by_id.get(&id))
    {
        return format!("{}: {}", option.label, option.option_text);
    }
    match answer.other_text.as_deref() {
        Some("") => "Other".to_string(),
        Some(text) => format!("Other: {}", text),
        None => EMPTY_ANSWER.to_string(),
    }
}

/// Two sides match only when both selected a regular (non-"other") option
/// carrying the same label. Free-text answers are semantically
/// incomparable and never match; a missing side never matches. Paired
/// questions live in different editions, so the shared label, not the
/// option id, is the equality key; equal ids imply equal labels.
pub fn answers_match(
    a: Option<&AnswerRow>,
    b: Option<&AnswerRow>,
    options_by_id: &HashMap<Uuid, QuestionOption>,
) -> bool {
    let resolve = |answer: Option<&AnswerRow>| {
        answer
            .and_then(|a| a.selected_option_id)
            .and_then(|id| options_by_id.get(&id))
            .filter(|option| !option.is_other)
    };
    match (resolve(a), resolve(b)) {
        (Some(opt_a), Some(opt_b)) => opt_a.label == opt_b.label,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(question_id: Uuid, label: &str, is_other: bool) -> QuestionOption {
        QuestionOption {
            id: Uuid::new_v4(),
            question_id,
            label: label.to_string(),
            option_text: format!("text for {}", label),
            is_other,
            order_num: 0,
        }
    }

    fn answer(question_id: Uuid, selected: Option<Uuid>, other: Option<&str>) -> AnswerRow {
        AnswerRow {
            user_id: Uuid::new_v4(),
            question_id,
            selected_option_id: selected,
            other_text: other.map(String::from),
        }
    }

    fn index(options: &[QuestionOption]) -> HashMap<Uuid, QuestionOption> {
        options.iter().cloned().map(|o| (o.id, o)).collect()
    }

    #[test]
    fn same_label_across_editions_matches() {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let opts = vec![option(q1, "A", false), option(q2, "A", false)];
        let idx = index(&opts);
        let a = answer(q1, Some(opts[0].id), None);
        let b = answer(q2, Some(opts[1].id), None);
        assert!(answers_match(Some(&a), Some(&b), &idx));
    }

    #[test]
    fn equal_option_ids_match() {
        let q = Uuid::new_v4();
        let opts = vec![option(q, "B", false)];
        let idx = index(&opts);
        let a = answer(q, Some(opts[0].id), None);
        let b = answer(q, Some(opts[0].id), None);
        assert!(answers_match(Some(&a), Some(&b), &idx));
    }

    #[test]
    fn free_text_never_matches() {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let opts = vec![option(q1, "A", false), option(q2, "other", true)];
        let idx = index(&opts);
        let a = answer(q1, Some(opts[0].id), None);
        let b = answer(q2, None, Some("same thing"));
        assert!(!answers_match(Some(&a), Some(&b), &idx));
        assert!(!answers_match(Some(&b), Some(&b), &idx));
    }

    #[test]
    fn missing_side_never_matches() {
        let q = Uuid::new_v4();
        let opts = vec![option(q, "A", false)];
        let idx = index(&opts);
        let a = answer(q, Some(opts[0].id), None);
        assert!(!answers_match(Some(&a), None, &idx));
        assert!(!answers_match(None, None, &idx));
    }

    #[test]
    fn selecting_the_other_option_row_never_matches() {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let opts = vec![option(q1, "other", true), option(q2, "other", true)];
        let idx = index(&opts);
        let a = answer(q1, Some(opts[0].id), None);
        let b = answer(q2, Some(opts[1].id), None);
        assert!(!answers_match(Some(&a), Some(&b), &idx));
    }

    #[test]
    fn answer_text_renders_each_shape() {
        let q = Uuid::new_v4();
        let opts = vec![option(q, "A", false)];
        let idx = index(&opts);

        let selected = answer(q, Some(opts[0].id), None);
        assert_eq!(answer_text(Some(&selected), &idx), "A: text for A");

        let freeform = answer(q, None, Some("spontaneous"));
        assert_eq!(answer_text(Some(&freeform), &idx), "Other: spontaneous");

        let empty_other = answer(q, None, Some(""));
        assert_eq!(answer_text(Some(&empty_other), &idx), "Other");

        let blank = answer(q, None, None);
        assert_eq!(answer_text(Some(&blank), &idx), "\u{2014}");

        assert_eq!(answer_text(None, &idx), "\u{2014}");
    }
}
