use repose_hooks::Service;
use repose_hooks::prelude::*;
use web_time::Duration;

const WORDS: &[&str] = &["rust", "rustc", "rustup", "ruby", "racket", "python", "ocaml"];
const FRAME: Duration = Duration::from_millis(16);
const TYPED: &str = "rust";

fn search_words() -> Service<String, Vec<&'static str>> {
    service(|q: String| async move {
        sleep(Duration::from_millis(80)).await;
        Ok(WORDS.iter().copied().filter(|w| w.starts_with(q.as_str())).collect())
    })
}

fn search_box(query: &str) -> Fetch<String, Vec<&'static str>> {
    let options = RequestOptions::<String, Vec<&'static str>>::new(String::new())
        .manual(true)
        .debounce(RateLimitPolicy::debounce(Duration::from_millis(250)))
        .on_before(|q| log::info!("searching {q:?}"))
        .on_success(|hits, q| log::info!("{q:?} -> {hits:?}"));
    let fetch = use_request(search_words(), options);

    let query = query.to_string();
    use_effect(query.clone(), {
        let fetch = fetch.clone();
        move || {
            if !query.is_empty() {
                fetch.run(query);
            }
        }
    });
    fetch
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let comp = Composition::new();
    let start = now();
    let mut frame = 0usize;
    let mut last_phase = None;

    loop {
        // one keystroke every sixth frame
        let typed = (frame / 6).min(TYPED.len());
        let query = &TYPED[..typed];
        let fetch = comp.compose(|| search_box(query));
        pump();

        let state = fetch.state();
        if last_phase != Some(state.phase()) {
            log::info!(
                "{:>4}ms {query:<5} {:?}",
                now().duration_since(start).as_millis(),
                state.phase()
            );
            last_phase = Some(state.phase());
        }
        if typed == TYPED.len() && state.phase() == Phase::Success {
            break;
        }
        if now().duration_since(start) > Duration::from_secs(5) {
            anyhow::bail!("search for {TYPED:?} never settled");
        }

        std::thread::sleep(FRAME);
        frame += 1;
    }

    comp.dispose();
    Ok(())
}
