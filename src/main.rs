//! Wallpick entry point
//!
//! Handles platform-specific initialization and mounts the page.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlElement, MouseEvent};

    use wallpick::Persisted;
    use wallpick::{store, wallpaper};

    /// Logo header rendered into the `#app` mount point.
    const APP_HTML: &str = r#"
  <div class="container logos">
    <a href="https://www.rust-lang.org" target="_blank">
      <img src="/rust.svg" class="logo rust" alt="Rust logo" />
    </a>
    <a href="https://webassembly.org" target="_blank">
      <img src="/wasm.svg" class="logo wasm" alt="WebAssembly logo" />
    </a>
  </div>
"#;

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Wallpick starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let app = document
            .get_element_by_id("app")
            .expect("no #app mount point");
        app.set_inner_html(APP_HTML);

        let backend = store::detect();
        let selection = wallpaper::selection(backend);

        // Keep the page background in sync with the persisted selection.
        let body: HtmlElement = document.body().expect("no body");
        selection.subscribe(move |picked: &String| match wallpaper::css_background(picked) {
            Some(css) => {
                let _ = body.style().set_property("background-image", &css);
            }
            None => {
                let _ = body.style().remove_property("background-image");
            }
        });

        setup_picker(&document, selection);

        log::info!("Wallpick running!");
    }

    /// Wallpaper path behind a click, if the click landed on a picker
    /// element.
    fn picked_wallpaper(event: &MouseEvent) -> Option<String> {
        let target: Element = event.target()?.dyn_into().ok()?;
        let picked = target.closest("[data-wallpaper]").ok()??;
        picked.get_attribute("data-wallpaper")
    }

    /// Delegated click handler: any element carrying `data-wallpaper`
    /// updates the selection. The forgotten closure owns the store for the
    /// page lifetime.
    fn setup_picker(document: &Document, selection: Persisted<String>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            if let Some(path) = picked_wallpaper(&event) {
                log::info!("Wallpaper picked: {:?}", path);
                selection.set(path).expect("failed to encode selection");
            }
        });
        let _ =
            document.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Wallpick (native) starting...");
    log::info!("Native mode has no rendering surface - run with `trunk serve` for the web version");

    // Run demo
    println!("\nRunning selection store demo...");
    demo_selection_store();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn demo_selection_store() {
    use std::rc::Rc;
    use wallpick::MemoryStorage;
    use wallpick::wallpaper;

    let backend = MemoryStorage::new();
    let selection = wallpaper::selection(Rc::new(backend.clone()));
    assert_eq!(selection.get(), "");

    selection.subscribe(|picked: &String| println!("  selection is now {:?}", picked));
    selection
        .set("wallpapers/beach.jpg".to_string())
        .expect("failed to encode selection");

    let rebuilt = wallpaper::selection(Rc::new(backend));
    assert_eq!(rebuilt.get(), "wallpapers/beach.jpg");
    println!("✓ Selection store demo passed!");
}
