use crate::settings::{Direction, Modality, SessionSettings};
use crate::util::{coin, random_index, shuffle, similarity};
use crate::word::Word;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

/// Similarity at or above which a near miss counts as a typo.
pub const TYPO_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerCheck {
    Correct,
    /// Close enough to pass, but not exact.
    Typo,
    Wrong,
}

impl AnswerCheck {
    pub fn passed(self) -> bool {
        !matches!(self, AnswerCheck::Wrong)
    }
}

/// Enabled modalities in canonical order; writing and multi-select when none are set.
pub fn enabled_modalities(modalities: &[Modality]) -> Vec<Modality> {
    let enabled: Vec<Modality> = modalities.iter().copied().sorted().dedup().collect();
    if enabled.is_empty() {
        vec![Modality::Writing, Modality::MultiSelect]
    } else {
        enabled
    }
}

pub fn choose_modality<R: Rng + ?Sized>(
    settings: &SessionSettings,
    question_index: usize,
    rng: &mut R,
) -> Modality {
    let enabled = enabled_modalities(&settings.modalities);
    if enabled.len() == 1 {
        return enabled[0];
    }

    if settings.alternate_modalities {
        enabled[question_index % enabled.len()]
    } else {
        *enabled.choose(rng).unwrap_or(&Modality::Writing)
    }
}

pub fn choose_direction<R: Rng + ?Sized>(settings: &SessionSettings, rng: &mut R) -> Direction {
    if settings.only_second_language_tested || coin(rng) {
        Direction::FirstToSecond
    } else {
        Direction::SecondToFirst
    }
}

pub fn display_word(word: &Word, direction: Direction) -> &str {
    match direction {
        Direction::FirstToSecond => &word.language1,
        Direction::SecondToFirst => &word.language2,
    }
}

pub fn expected_answer(word: &Word, direction: Direction) -> &str {
    match direction {
        Direction::FirstToSecond => &word.language2,
        Direction::SecondToFirst => &word.language1,
    }
}

/// Example sentence written in the language of the expected answer.
pub fn answer_sentence(word: &Word, direction: Direction) -> Option<&str> {
    match direction {
        Direction::FirstToSecond => word.language2_sentence.as_deref(),
        Direction::SecondToFirst => word.language1_sentence.as_deref(),
    }
}

pub fn check_answer(guess: &str, expected: &str, allow_typos: bool) -> AnswerCheck {
    if guess.trim() == expected.trim() {
        AnswerCheck::Correct
    } else if allow_typos && similarity(guess, expected) >= TYPO_THRESHOLD {
        AnswerCheck::Typo
    } else {
        AnswerCheck::Wrong
    }
}

/// How far a word has come towards the repetition target.
pub fn progress(word: &Word, progress_on_mistakes: bool) -> u32 {
    if progress_on_mistakes {
        word.times_correct + word.times_failed
    } else {
        word.times_correct
    }
}

pub fn count_words_left(words: &[Word], target: u32, progress_on_mistakes: bool) -> usize {
    words
        .iter()
        .filter(|w| progress(w, progress_on_mistakes) < target)
        .count()
}

/// Multi-select options: the expected answer plus distinct distractors, shuffled.
///
/// The option count is clamped to at least 2 and at most the number of
/// distinct candidate answers, so small sets just get fewer options.
pub fn build_options<R: Rng + ?Sized>(
    words: &[Word],
    index: usize,
    direction: Direction,
    requested: usize,
    rng: &mut R,
) -> Vec<String> {
    let Some(word) = words.get(index) else {
        return Vec::new();
    };
    let correct = expected_answer(word, direction).to_string();

    let mut distractors: Vec<String> = words
        .iter()
        .map(|w| expected_answer(w, direction))
        .filter(|a| *a != correct)
        .unique()
        .map(str::to_string)
        .collect();

    let wanted = requested.max(2).min(distractors.len() + 1);
    shuffle(&mut distractors, rng);
    distractors.truncate(wanted - 1);

    let mut options = distractors;
    options.push(correct);
    shuffle(&mut options, rng);
    options
}

/// One drag-and-drop matching board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragDropBoard {
    /// Word indices in prompt order; contains the active word.
    pub word_indices: Vec<usize>,
    pub prompts: Vec<String>,
    /// Expected answers of the prompts, shuffled independently.
    pub answers: Vec<String>,
}

impl DragDropBoard {
    pub fn expected(&self, words: &[Word], position: usize, direction: Direction) -> Option<String> {
        self.word_indices
            .get(position)
            .and_then(|i| words.get(*i))
            .map(|w| expected_answer(w, direction).to_string())
    }
}

pub fn build_drag_drop<R: Rng + ?Sized>(
    words: &[Word],
    index: usize,
    direction: Direction,
    batch: usize,
    rng: &mut R,
) -> DragDropBoard {
    let mut others: Vec<usize> = (0..words.len()).filter(|i| *i != index).collect();
    shuffle(&mut others, rng);
    others.truncate(batch.max(2).saturating_sub(1));

    let mut word_indices = others;
    word_indices.push(index);
    shuffle(&mut word_indices, rng);

    let prompts = word_indices
        .iter()
        .map(|i| display_word(&words[*i], direction).to_string())
        .collect();
    let mut answers: Vec<String> = word_indices
        .iter()
        .map(|i| expected_answer(&words[*i], direction).to_string())
        .collect();
    shuffle(&mut answers, rng);

    DragDropBoard {
        word_indices,
        prompts,
        answers,
    }
}

/// Blank out the first case-insensitive occurrence of `answer` in `sentence`.
pub fn blank_sentence(sentence: &str, answer: &str) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }

    let lower = |c: char| c.to_lowercase().next().unwrap_or(c);
    let sentence_chars: Vec<char> = sentence.chars().collect();
    let needle: Vec<char> = answer.chars().map(lower).collect();
    let lowered: Vec<char> = sentence_chars.iter().copied().map(lower).collect();

    let start = lowered
        .windows(needle.len())
        .position(|window| window == needle.as_slice())?;

    let mut blanked: String = sentence_chars[..start].iter().collect();
    blanked.push_str(&"_".repeat(needle.len()));
    blanked.extend(&sentence_chars[start + needle.len()..]);
    Some(blanked)
}

/// Fall back to writing when the chosen modality cannot be served for this word.
pub fn feasible_modality(
    modality: Modality,
    words: &[Word],
    index: usize,
    direction: Direction,
) -> Modality {
    let feasible = match modality {
        Modality::Writing => true,
        // a choice needs at least one distractor
        Modality::MultiSelect => {
            words
                .iter()
                .map(|w| expected_answer(w, direction))
                .unique()
                .count()
                >= 2
        }
        Modality::DragDrop => words.len() >= 2,
        Modality::Sentence => words.get(index).is_some_and(|w| {
            answer_sentence(w, direction)
                .and_then(|s| blank_sentence(s, expected_answer(w, direction)))
                .is_some()
        }),
    };

    if feasible {
        modality
    } else {
        Modality::Writing
    }
}

/// Pick the next word uniformly among those still below the target.
///
/// `exclude` drops one index from the pool when other candidates remain.
pub fn select_next_word<R: Rng + ?Sized>(
    words: &[Word],
    target: u32,
    progress_on_mistakes: bool,
    exclude: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    let eligible: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| progress(w, progress_on_mistakes) < target)
        .map(|(i, _)| i)
        .collect();

    let pool: Vec<usize> = match exclude {
        Some(previous) if eligible.len() > 1 => {
            eligible.iter().copied().filter(|i| *i != previous).collect()
        }
        _ => eligible,
    };

    random_index(pool.len(), rng).map(|i| pool[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn words() -> Vec<Word> {
        vec![
            Word::new(0, "dog", "perro"),
            Word::new(1, "cat", "gato"),
            Word::new(2, "hello", "hola"),
            Word::new(3, "house", "casa"),
        ]
    }

    fn settings_with(modalities: Vec<Modality>, alternate: bool) -> SessionSettings {
        SessionSettings {
            modalities,
            alternate_modalities: alternate,
            ..SessionSettings::default()
        }
    }

    #[test]
    fn test_enabled_modalities_default() {
        assert_eq!(
            enabled_modalities(&[]),
            vec![Modality::Writing, Modality::MultiSelect]
        );
        assert_eq!(
            enabled_modalities(&[Modality::Sentence, Modality::Writing, Modality::Sentence]),
            vec![Modality::Writing, Modality::Sentence]
        );
    }

    #[test]
    fn test_single_modality_always_returned() {
        let settings = settings_with(vec![Modality::Writing], false);
        let mut rng = rng();
        for i in 0..20 {
            assert_eq!(choose_modality(&settings, i, &mut rng), Modality::Writing);
        }
    }

    #[test]
    fn test_alternating_modalities_round_robin() {
        let settings = settings_with(vec![Modality::Writing, Modality::MultiSelect], true);
        let mut rng = rng();
        let chosen: Vec<Modality> = (0..4).map(|i| choose_modality(&settings, i, &mut rng)).collect();
        assert_eq!(
            chosen,
            vec![
                Modality::Writing,
                Modality::MultiSelect,
                Modality::Writing,
                Modality::MultiSelect
            ]
        );
    }

    #[test]
    fn test_random_modality_stays_in_enabled_set() {
        let settings = settings_with(vec![Modality::DragDrop, Modality::Sentence], false);
        let mut rng = rng();
        for i in 0..50 {
            let m = choose_modality(&settings, i, &mut rng);
            assert!(matches!(m, Modality::DragDrop | Modality::Sentence));
        }
    }

    #[test]
    fn test_direction_restricted() {
        let settings = SessionSettings {
            only_second_language_tested: true,
            ..SessionSettings::default()
        };
        let mut rng = rng();
        for _ in 0..20 {
            assert_eq!(choose_direction(&settings, &mut rng), Direction::FirstToSecond);
        }
    }

    #[test]
    fn test_direction_random_uses_both() {
        let settings = SessionSettings::default();
        let mut rng = rng();
        let directions: Vec<Direction> = (0..64).map(|_| choose_direction(&settings, &mut rng)).collect();
        assert!(directions.contains(&Direction::FirstToSecond));
        assert!(directions.contains(&Direction::SecondToFirst));
    }

    #[test]
    fn test_projections() {
        let word = Word::new(0, "hello", "hola");
        assert_eq!(display_word(&word, Direction::FirstToSecond), "hello");
        assert_eq!(expected_answer(&word, Direction::FirstToSecond), "hola");
        assert_eq!(display_word(&word, Direction::SecondToFirst), "hola");
        assert_eq!(expected_answer(&word, Direction::SecondToFirst), "hello");
    }

    #[test]
    fn test_check_answer() {
        let word = Word::new(0, "hello", "hola");
        let expected = expected_answer(&word, Direction::FirstToSecond);

        assert_eq!(check_answer("hola", expected, true), AnswerCheck::Correct);
        assert_eq!(check_answer(" hola ", expected, false), AnswerCheck::Correct);
        assert_eq!(check_answer("hallo", expected, true), AnswerCheck::Typo);
        assert_eq!(check_answer("hallo", expected, false), AnswerCheck::Wrong);
        assert_eq!(check_answer("xyz", expected, true), AnswerCheck::Wrong);
        assert_eq!(check_answer("Hola", expected, true), AnswerCheck::Typo);
        assert!(AnswerCheck::Typo.passed());
        assert!(!AnswerCheck::Wrong.passed());
    }

    #[test]
    fn test_count_words_left() {
        let mut words = words();
        words[0].times_correct = 2;
        words[1].times_correct = 1;
        words[1].times_failed = 1;

        assert_eq!(count_words_left(&words, 2, false), 3);
        assert_eq!(count_words_left(&words, 2, true), 2);
        assert_eq!(count_words_left(&words, 1, false), 2);
    }

    #[test]
    fn test_build_options_contains_answer() {
        let words = words();
        let mut rng = rng();
        let options = build_options(&words, 2, Direction::FirstToSecond, 3, &mut rng);

        assert_eq!(options.len(), 3);
        assert!(options.contains(&"hola".to_string()));
        assert_eq!(options.iter().unique().count(), 3);
    }

    #[test]
    fn test_build_options_clamped() {
        let mut words = words();
        words[1].language2 = "perro".to_string();
        let mut rng = rng();

        // 3 distinct answers available
        let options = build_options(&words, 0, Direction::FirstToSecond, 10, &mut rng);
        assert_eq!(options.len(), 3);

        // at least two even when asked for fewer
        let options = build_options(&words, 0, Direction::FirstToSecond, 0, &mut rng);
        assert_eq!(options.len(), 2);

        let single = vec![Word::new(0, "a", "b")];
        let options = build_options(&single, 0, Direction::FirstToSecond, 4, &mut rng);
        assert_eq!(options, vec!["b".to_string()]);
    }

    #[test]
    fn test_build_drag_drop() {
        let words = words();
        let mut rng = rng();
        let board = build_drag_drop(&words, 1, Direction::SecondToFirst, 3, &mut rng);

        assert_eq!(board.word_indices.len(), 3);
        assert!(board.word_indices.contains(&1));
        assert_eq!(board.prompts.len(), 3);
        let mut answers = board.answers.clone();
        answers.sort();
        let mut expected: Vec<String> = board
            .word_indices
            .iter()
            .map(|i| words[*i].language1.clone())
            .collect();
        expected.sort();
        assert_eq!(answers, expected);

        let position = board.word_indices.iter().position(|i| *i == 1).unwrap();
        assert_eq!(board.prompts[position], "gato");
        assert_eq!(
            board.expected(&words, position, Direction::SecondToFirst),
            Some("cat".to_string())
        );
    }

    #[test]
    fn test_blank_sentence() {
        assert_eq!(
            blank_sentence("El perro come.", "perro"),
            Some("El _____ come.".to_string())
        );
        assert_eq!(
            blank_sentence("Perro grande", "perro"),
            Some("_____ grande".to_string())
        );
        assert_eq!(blank_sentence("El gato come.", "perro"), None);
        assert_eq!(blank_sentence("anything", " "), None);
    }

    #[test]
    fn test_feasible_modality() {
        let mut words = words();
        words[0].language2_sentence = Some("Mi perro duerme.".to_string());

        assert_eq!(
            feasible_modality(Modality::Sentence, &words, 0, Direction::FirstToSecond),
            Modality::Sentence
        );
        assert_eq!(
            feasible_modality(Modality::Sentence, &words, 0, Direction::SecondToFirst),
            Modality::Writing
        );
        assert_eq!(
            feasible_modality(Modality::DragDrop, &words[..1], 0, Direction::FirstToSecond),
            Modality::Writing
        );
    }

    #[test]
    fn test_multi_select_needs_a_distractor() {
        let words = words();
        assert_eq!(
            feasible_modality(Modality::MultiSelect, &words, 0, Direction::FirstToSecond),
            Modality::MultiSelect
        );
        assert_eq!(
            feasible_modality(Modality::MultiSelect, &words[..1], 0, Direction::FirstToSecond),
            Modality::Writing
        );

        // same answer everywhere in one direction, distinct in the other
        let same = vec![Word::new(0, "hi", "hola"), Word::new(1, "hello", "hola")];
        assert_eq!(
            feasible_modality(Modality::MultiSelect, &same, 0, Direction::FirstToSecond),
            Modality::Writing
        );
        assert_eq!(
            feasible_modality(Modality::MultiSelect, &same, 0, Direction::SecondToFirst),
            Modality::MultiSelect
        );
    }

    #[test]
    fn test_check_answer_accepts_anagrams_as_typos() {
        // the similarity score ignores letter order
        assert_eq!(check_answer("god", "dog", true), AnswerCheck::Typo);
        assert_eq!(check_answer("live", "evil", true), AnswerCheck::Typo);
        assert_eq!(check_answer("god", "dog", false), AnswerCheck::Wrong);
    }

    #[test]
    fn test_select_next_word_skips_completed() {
        let mut words = words();
        words[0].times_correct = 1;
        words[1].times_correct = 1;
        words[3].times_correct = 1;
        let mut rng = rng();

        for _ in 0..10 {
            assert_eq!(select_next_word(&words, 1, false, None, &mut rng), Some(2));
        }
        // the only remaining word may be picked again
        assert_eq!(select_next_word(&words, 1, false, Some(2), &mut rng), Some(2));

        words[2].times_correct = 1;
        assert_eq!(select_next_word(&words, 1, false, None, &mut rng), None);
    }

    #[test]
    fn test_select_next_word_excludes_previous_when_possible() {
        let words = words();
        let mut rng = rng();
        for _ in 0..30 {
            let next = select_next_word(&words, 1, false, Some(0), &mut rng).unwrap();
            assert_ne!(next, 0);
        }
    }
}
