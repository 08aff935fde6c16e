use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use rand::{rngs::StdRng, SeedableRng};
use vocabquizbot::{
    catalog::{parse_catalog, Catalog, CatalogCache, CatalogSource},
    error::{FetchError, SessionError},
    session::{
        answer_and_advance, next_question, start_session, stop_session, Progress, ScoreSummary,
        SessionStatus, SessionStore,
    },
};

const SHEET: &str = "\
Phrasal verb/ Vocab,Meaning,Type
give up,stop trying,phrasal
look after,take care of,phrasal
put off,postpone,phrasal
carry on,continue,phrasal
set off,start a journey,phrasal
keen,eager,adjective
sturdy,strong and solid,adjective
";

struct StaticSheet {
    fetches: Arc<AtomicUsize>,
}

impl CatalogSource for StaticSheet {
    async fn fetch(&self) -> Result<Catalog, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        parse_catalog(SHEET.as_bytes())
    }
}

fn correct_label(session: &vocabquizbot::session::SessionState) -> String {
    session
        .current_options()
        .iter()
        .find(|o| o.meaning == session.current_correct_meaning())
        .map(|o| o.label.clone())
        .unwrap()
}

#[tokio::test]
async fn full_quiz_from_cached_sheet() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let cache = CatalogCache::new(
        StaticSheet {
            fetches: fetches.clone(),
        },
        Duration::from_secs(300),
        Duration::from_secs(5),
    );
    let mut rng = StdRng::seed_from_u64(42);

    let catalog = cache.get().await.unwrap();
    assert_eq!(catalog.len(), 7);

    let mut session = start_session(&catalog, 4, &mut rng);
    let mut question = next_question(&mut session, &mut rng).unwrap();
    let mut answered = 0;

    loop {
        assert!(question.text.contains(&format!("Question {}/4", answered + 1)));
        let label = correct_label(&session);
        let report = answer_and_advance(&mut session, &label, &mut rng).unwrap();
        answered += 1;
        assert!(report.outcome.is_correct);

        match report.progress {
            Progress::Next(next) => question = next,
            Progress::Finished(summary) => {
                assert_eq!(summary, ScoreSummary { score: 4, total: 4 });
                break;
            }
        }
    }

    assert_eq!(answered, 4);
    assert_eq!(session.status(), SessionStatus::Finished);

    let again = cache.get().await.unwrap();
    assert!(again.ptr_eq(&catalog));
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_users_do_not_interfere() {
    let catalog = parse_catalog(SHEET.as_bytes()).unwrap();
    let store = Arc::new(SessionStore::<u64>::new());
    let mut rng = StdRng::seed_from_u64(7);

    store.put(1, start_session(&catalog, 5, &mut rng));
    store.put(2, start_session(&catalog, 5, &mut rng));

    let handles: Vec<_> = [(1u64, 3usize), (2u64, 1usize)]
        .into_iter()
        .map(|(user, answers)| {
            let store = store.clone();
            std::thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(user);
                store.update(&user, |s| next_question(s, &mut rng));
                for _ in 0..answers {
                    store
                        .update(&user, |s| answer_and_advance(s, "Z", &mut rng))
                        .unwrap()
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let first = store.get(&1).unwrap();
    let second = store.get(&2).unwrap();
    assert_eq!((first.index(), first.score()), (4, 0));
    assert_eq!((second.index(), second.score()), (2, 0));

    assert_eq!(
        store.update(&2, stop_session),
        Some(Ok(ScoreSummary { score: 0, total: 2 }))
    );
    assert!(store.get(&1).unwrap().is_active());
    assert_eq!(
        store.update(&2, stop_session),
        Some(Err(SessionError::NoActiveSession))
    );
}
