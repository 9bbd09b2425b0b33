use gtk4 as gtk;
use libadwaita as adw;

use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::{gdk, gio, glib};

use crate::window::FaceRecoWindow;

pub const APP_ID: &str = "io.github.facereco.FaceReco";

/// Window action shortcuts; the actions live on `FaceRecoWindow`.
const SHORTCUTS: &[(&str, &[&str])] = &[
    ("win.start-camera", &["<Ctrl>r"]),
    ("win.stop-camera", &["<Ctrl>period"]),
    ("win.load-faces", &["<Ctrl>o"]),
    ("win.capture-face", &["<Ctrl>n"]),
    ("win.toggle-recognition", &["<Ctrl>t"]),
    ("app.quit", &["<Ctrl>q"]),
];

const STYLE: &str = r#"
    .camera-view {
        background-color: black;
        border-radius: 8px;
        min-width: 640px;
        min-height: 480px;
    }
    .status-bar {
        padding: 4px 12px;
        border-top: 1px solid alpha(currentColor, 0.15);
    }
"#;

mod imp {
    use super::*;

    #[derive(Debug, Default)]
    pub struct FaceRecoApplication;

    #[glib::object_subclass]
    impl ObjectSubclass for FaceRecoApplication {
        const NAME: &'static str = "FaceRecoApplication";
        type Type = super::FaceRecoApplication;
        type ParentType = adw::Application;
    }

    impl ObjectImpl for FaceRecoApplication {}

    impl ApplicationImpl for FaceRecoApplication {
        fn startup(&self) {
            self.parent_startup();
            let obj = self.obj();
            obj.install_actions();
            install_style();
        }

        fn activate(&self) {
            let app = self.obj();
            // Single instance: re-activation raises the existing window.
            if let Some(window) = app.active_window() {
                window.present();
                return;
            }
            FaceRecoWindow::new(&app).present();
        }
    }

    impl GtkApplicationImpl for FaceRecoApplication {}
    impl AdwApplicationImpl for FaceRecoApplication {}
}

glib::wrapper! {
    pub struct FaceRecoApplication(ObjectSubclass<imp::FaceRecoApplication>)
        @extends gio::Application, gtk::Application, adw::Application,
        @implements gio::ActionGroup, gio::ActionMap;
}

impl FaceRecoApplication {
    pub fn new() -> Self {
        glib::Object::builder()
            .property("application-id", APP_ID)
            .property("flags", gio::ApplicationFlags::empty())
            .build()
    }

    fn install_actions(&self) {
        self.add_action_entries([
            gio::ActionEntry::builder("about")
                .activate(|app: &Self, _, _| app.present_about())
                .build(),
            gio::ActionEntry::builder("quit")
                .activate(|app: &Self, _, _| {
                    // close_request stops the camera
                    for window in app.windows() {
                        window.close();
                    }
                    app.quit();
                })
                .build(),
        ]);

        for (action, accels) in SHORTCUTS {
            self.set_accels_for_action(action, accels);
        }
    }

    fn present_about(&self) {
        let about = adw::AboutWindow::builder()
            .application_name("FaceReco")
            .application_icon("camera-web-symbolic")
            .version(env!("CARGO_PKG_VERSION"))
            .comments("Recognizes faces in the camera feed against a folder of labelled photos")
            .license_type(gtk::License::Gpl30)
            .website(env!("CARGO_PKG_REPOSITORY"))
            .modal(true)
            .build();

        if let Some(parent) = self.active_window() {
            about.set_transient_for(Some(&parent));
        }
        about.present();
    }
}

fn install_style() {
    let Some(display) = gdk::Display::default() else {
        return;
    };
    let provider = gtk::CssProvider::new();
    provider.load_from_string(STYLE);
    gtk::style_context_add_provider_for_display(
        &display,
        &provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );
}
