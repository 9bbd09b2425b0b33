mod app;
mod window;

use app::FaceRecoApplication;
use gtk4::prelude::*;
use libadwaita as adw;

fn main() -> anyhow::Result<gtk4::glib::ExitCode> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    adw::init()?;
    let app = FaceRecoApplication::new();
    Ok(app.run())
}
