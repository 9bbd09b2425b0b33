use gtk4 as gtk;
use libadwaita as adw;

use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::{gdk, gio, glib};

use anyhow::Context;
use log::{error, warn};
use std::cell::RefCell;
use std::sync::Arc;

use facereco::camera::OpenCvBackend;
use facereco::face::DlibEngine;
use facereco::gallery::Gallery;
use facereco::registration::{self, PendingFace};
use facereco::{latest_frame_channel, AppConfig, Controller, DisplayReceiver, DisplayUpdate, Registration};

use crate::app::FaceRecoApplication;

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct FaceRecoWindow {
        // State
        pub controller: RefCell<Option<Controller>>,
        pub pending_face: RefCell<Option<PendingFace>>,

        // UI widgets
        pub picture: RefCell<Option<gtk::Picture>>,
        pub btn_start: RefCell<Option<gtk::Button>>,
        pub btn_stop: RefCell<Option<gtk::Button>>,
        pub chk_recognition: RefCell<Option<gtk::CheckButton>>,
        pub known_list: RefCell<Option<gtk::ListBox>>,
        pub lbl_status: RefCell<Option<gtk::Label>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for FaceRecoWindow {
        const NAME: &'static str = "FaceRecoWindow";
        type Type = super::FaceRecoWindow;
        type ParentType = adw::ApplicationWindow;
    }

    impl ObjectImpl for FaceRecoWindow {
        fn constructed(&self) {
            self.parent_constructed();
            let obj = self.obj();
            obj.build_ui();
            obj.install_actions();

            glib::idle_add_local_once(glib::clone!(
                #[weak] obj,
                move || { obj.initialize(); }
            ));
        }
    }

    impl WidgetImpl for FaceRecoWindow {}

    impl WindowImpl for FaceRecoWindow {
        fn close_request(&self) -> glib::Propagation {
            if let Some(controller) = self.controller.borrow_mut().as_mut() {
                controller.stop_camera();
            }
            self.parent_close_request()
        }
    }

    impl ApplicationWindowImpl for FaceRecoWindow {}
    impl AdwApplicationWindowImpl for FaceRecoWindow {}
}

glib::wrapper! {
    pub struct FaceRecoWindow(ObjectSubclass<imp::FaceRecoWindow>)
        @extends gtk::Widget, gtk::Window, gtk::ApplicationWindow, adw::ApplicationWindow,
        @implements gio::ActionGroup, gio::ActionMap, gtk::Accessible, gtk::Buildable,
                    gtk::ConstraintTarget, gtk::Native, gtk::Root, gtk::ShortcutManager;
}

impl FaceRecoWindow {
    pub fn new(app: &FaceRecoApplication) -> Self {
        glib::Object::builder()
            .property("application", app)
            .build()
    }

    fn build_ui(&self) {
        let imp = self.imp();

        let toolbar = adw::ToolbarView::new();
        let header = adw::HeaderBar::new();

        let menu_btn = gtk::MenuButton::builder()
            .icon_name("open-menu-symbolic")
            .build();
        let menu = gio::Menu::new();
        menu.append(Some("_Load Known Faces"), Some("win.load-faces"));
        menu.append(Some("_Capture New Face"), Some("win.capture-face"));
        menu.append(Some("_About FaceReco"), Some("app.about"));
        menu.append(Some("_Quit"), Some("app.quit"));
        menu_btn.set_menu_model(Some(&menu));
        header.pack_end(&menu_btn);
        toolbar.add_top_bar(&header);

        let content = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(12)
            .margin_top(12)
            .margin_bottom(12)
            .margin_start(12)
            .margin_end(12)
            .build();

        // Video
        let picture = gtk::Picture::builder()
            .content_fit(gtk::ContentFit::Contain)
            .hexpand(true)
            .vexpand(true)
            .css_classes(["camera-view"])
            .build();

        // Control panel
        let controls = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(10)
            .width_request(220)
            .build();

        let btn_start = gtk::Button::builder()
            .label("Start Camera")
            .css_classes(["suggested-action"])
            .build();
        btn_start.connect_clicked(glib::clone!(
            #[weak(rename_to = window)] self,
            move |_| { window.start_camera(); }
        ));

        let btn_stop = gtk::Button::builder()
            .label("Stop Camera")
            .sensitive(false)
            .build();
        btn_stop.connect_clicked(glib::clone!(
            #[weak(rename_to = window)] self,
            move |_| { window.stop_camera(); }
        ));

        let btn_load = gtk::Button::builder()
            .label("Load Known Faces")
            .build();
        btn_load.connect_clicked(glib::clone!(
            #[weak(rename_to = window)] self,
            move |_| { window.load_known_faces(); }
        ));

        let btn_capture = gtk::Button::builder()
            .label("Capture New Face")
            .build();
        btn_capture.connect_clicked(glib::clone!(
            #[weak(rename_to = window)] self,
            move |_| { window.capture_new_face(); }
        ));

        let chk_recognition = gtk::CheckButton::builder()
            .label("Enable Recognition")
            .active(true)
            .build();
        chk_recognition.connect_toggled(glib::clone!(
            #[weak(rename_to = window)] self,
            move |check| { window.toggle_recognition(check.is_active()); }
        ));

        let lbl_known = gtk::Label::builder()
            .label("Known Faces:")
            .halign(gtk::Align::Start)
            .margin_top(20)
            .css_classes(["heading"])
            .build();

        let known_list = gtk::ListBox::builder()
            .selection_mode(gtk::SelectionMode::None)
            .css_classes(["boxed-list"])
            .build();
        let known_scroll = gtk::ScrolledWindow::builder()
            .child(&known_list)
            .vexpand(true)
            .build();

        controls.append(&btn_start);
        controls.append(&btn_stop);
        controls.append(&btn_load);
        controls.append(&btn_capture);
        controls.append(&chk_recognition);
        controls.append(&lbl_known);
        controls.append(&known_scroll);

        content.append(&picture);
        content.append(&controls);
        toolbar.set_content(Some(&content));

        // Status bar
        let lbl_status = gtk::Label::builder()
            .label("Loading face models...")
            .halign(gtk::Align::Start)
            .css_classes(["dim-label", "status-bar"])
            .build();
        toolbar.add_bottom_bar(&lbl_status);

        self.set_content(Some(&toolbar));

        *imp.picture.borrow_mut() = Some(picture);
        *imp.btn_start.borrow_mut() = Some(btn_start);
        *imp.btn_stop.borrow_mut() = Some(btn_stop);
        *imp.chk_recognition.borrow_mut() = Some(chk_recognition);
        *imp.known_list.borrow_mut() = Some(known_list);
        *imp.lbl_status.borrow_mut() = Some(lbl_status);

        self.set_title(Some("Face Recognition"));
        self.set_default_size(1024, 768);
    }

    fn install_actions(&self) {
        self.add_action_entries([
            gio::ActionEntry::builder("start-camera")
                .activate(|window: &Self, _, _| window.start_camera())
                .build(),
            gio::ActionEntry::builder("stop-camera")
                .activate(|window: &Self, _, _| window.stop_camera())
                .build(),
            gio::ActionEntry::builder("load-faces")
                .activate(|window: &Self, _, _| window.load_known_faces())
                .build(),
            gio::ActionEntry::builder("capture-face")
                .activate(|window: &Self, _, _| window.capture_new_face())
                .build(),
            gio::ActionEntry::builder("toggle-recognition")
                .activate(|window: &Self, _, _| {
                    if let Some(ref check) = *window.imp().chk_recognition.borrow() {
                        check.set_active(!check.is_active());
                    }
                })
                .build(),
        ]);
    }

    fn initialize(&self) {
        let config = AppConfig::load(&AppConfig::default_path()).unwrap_or_else(|e| {
            warn!("Ignoring configuration: {}", e);
            AppConfig::default()
        });

        if let Some(ref check) = *self.imp().chk_recognition.borrow() {
            check.set_active(config.recognition.enabled);
        }

        // Model loading (and first-run download) happens off the main thread
        let (tx, rx) = async_channel::bounded::<anyhow::Result<Arc<DlibEngine>>>(1);
        let models_dir = config.storage.models_dir.clone();
        std::thread::spawn(move || {
            let result = DlibEngine::new(models_dir.as_deref())
                .map(Arc::new)
                .context("Failed to load face models");
            let _ = tx.send_blocking(result);
        });

        glib::spawn_future_local(glib::clone!(
            #[weak(rename_to = window)] self,
            async move {
                if let Ok(result) = rx.recv().await {
                    match result {
                        Ok(engine) => window.on_engine_ready(&config, engine),
                        Err(e) => {
                            error!("{:#}", e);
                            window.set_status("Face models unavailable");
                            window.show_message("Error", &format!("{:#}", e));
                        }
                    }
                }
            }
        ));
    }

    fn on_engine_ready(&self, config: &AppConfig, engine: Arc<DlibEngine>) {
        let (slot, receiver) = latest_frame_channel();
        let controller = Controller::new(config, Arc::new(OpenCvBackend), engine, Arc::new(slot));
        *self.imp().controller.borrow_mut() = Some(controller);

        self.spawn_display_loop(receiver);
        self.refresh_status();
    }

    fn spawn_display_loop(&self, receiver: DisplayReceiver) {
        glib::spawn_future_local(glib::clone!(
            #[weak(rename_to = window)] self,
            async move {
                while let Some(update) = receiver.recv().await {
                    window.show_update(update);
                }
            }
        ));
    }

    fn show_update(&self, update: DisplayUpdate) {
        let Some(picture) = self.imp().picture.borrow().clone() else {
            return;
        };

        match update {
            DisplayUpdate::Image(image) => {
                let (width, height) = image.dimensions();
                let bytes = glib::Bytes::from_owned(image.into_raw());
                let texture = gdk::MemoryTexture::new(
                    width as i32,
                    height as i32,
                    gdk::MemoryFormat::R8g8b8,
                    &bytes,
                    width as usize * 3,
                );
                picture.set_paintable(Some(&texture));
            }
            DisplayUpdate::Cleared => picture.set_paintable(None::<&gdk::Paintable>),
        }
    }

    /// Runs `f` on the controller; `None` while models are still loading.
    fn with_controller<R>(&self, f: impl FnOnce(&mut Controller) -> R) -> Option<R> {
        let result = self.imp().controller.borrow_mut().as_mut().map(f);
        if result.is_none() {
            self.show_message("Error", "Face models are not loaded yet");
        }
        result
    }

    fn start_camera(&self) {
        match self.with_controller(|c| c.start_camera()) {
            Some(Ok(())) => self.set_running(true),
            Some(Err(e)) => self.show_message("Error", &e.to_string()),
            None => {}
        }
        self.refresh_status();
    }

    fn stop_camera(&self) {
        if self.with_controller(|c| c.stop_camera()).is_some() {
            self.set_running(false);
        }
        self.refresh_status();
    }

    fn toggle_recognition(&self, enabled: bool) {
        if let Some(controller) = self.imp().controller.borrow_mut().as_mut() {
            controller.set_recognition(enabled);
        }
        self.refresh_status();
    }

    /// Runs `work` on a worker thread and hands its result to `done` on the
    /// main loop, if the window is still around.
    fn run_in_background<T, W, D>(&self, work: W, done: D)
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        D: FnOnce(&Self, T) + 'static,
    {
        let (tx, rx) = async_channel::bounded::<T>(1);
        std::thread::spawn(move || {
            let _ = tx.send_blocking(work());
        });

        glib::spawn_future_local(glib::clone!(
            #[weak(rename_to = window)] self,
            async move {
                if let Ok(result) = rx.recv().await {
                    done(&window, result);
                }
            }
        ));
    }

    fn load_known_faces(&self) {
        let dialog = gtk::FileDialog::builder()
            .title("Select Folder with Known Faces")
            .modal(true)
            .build();

        dialog.select_folder(Some(self), gio::Cancellable::NONE, glib::clone!(
            #[weak(rename_to = window)] self,
            move |result| {
                let Some(path) = result.ok().and_then(|folder| folder.path()) else {
                    return;
                };
                let Some(engine) = window.with_controller(|c| c.engine()) else {
                    return;
                };

                window.set_status("Loading known faces...");
                let dir = path.clone();
                window.run_in_background(
                    move || Gallery::load(&dir, engine.as_ref()),
                    move |window, result| {
                        match result {
                            Ok(load) => {
                                if let Some(count) = window.with_controller(|c| c.apply_gallery(&path, load)) {
                                    window.refresh_known_faces();
                                    window.show_message("Info", &format!("Successfully loaded {} faces", count));
                                }
                            }
                            Err(e) => window.show_message("Error", &e.to_string()),
                        }
                        window.refresh_status();
                    },
                );
            }
        ));
    }

    fn capture_new_face(&self) {
        let Some((ctx, engine, dir)) = self.with_controller(|c| {
            (c.context().clone(), c.engine(), c.gallery_dir().to_path_buf())
        }) else {
            return;
        };

        self.run_in_background(
            move || registration::prepare(&ctx, engine.as_ref(), &dir),
            |window, result| match result {
                Ok(pending) => {
                    *window.imp().pending_face.borrow_mut() = Some(pending);
                    window.show_name_dialog();
                }
                Err(e) if e.is_warning() => {
                    window.show_message("Warning", "Make sure exactly one face is visible");
                }
                Err(e) => window.show_message("Error", &e.to_string()),
            },
        );
    }

    fn show_name_dialog(&self) {
        let entry = gtk::Entry::builder()
            .placeholder_text("Name")
            .activates_default(true)
            .build();

        let dialog = adw::MessageDialog::builder()
            .heading("Name")
            .body("Enter the person's name:")
            .extra_child(&entry)
            .modal(true)
            .transient_for(self)
            .build();

        dialog.add_response("cancel", "Cancel");
        dialog.add_response("save", "Save");
        dialog.set_response_appearance("save", adw::ResponseAppearance::Suggested);
        dialog.set_default_response(Some("save"));
        dialog.set_close_response("cancel");

        dialog.connect_response(None, glib::clone!(
            #[weak(rename_to = window)] self,
            #[weak] entry,
            move |_, response| {
                let pending = window.imp().pending_face.borrow_mut().take();
                if response != "save" {
                    return;
                }
                if let Some(pending) = pending {
                    window.save_new_face(pending, entry.text().as_str());
                }
            }
        ));

        dialog.present();
    }

    fn save_new_face(&self, pending: PendingFace, label: &str) {
        let Some((engine, gallery)) = self.with_controller(|c| (c.engine(), c.context().gallery().clone())) else {
            return;
        };

        self.set_status("Saving face...");
        let label = label.to_string();
        self.run_in_background(
            move || pending.save(&label, engine.as_ref(), &gallery),
            |window, result| {
                match result {
                    Ok(outcome) => {
                        window.with_controller(|c| c.record_registration(&outcome));
                        if let Registration::Saved { name, .. } = outcome {
                            window.refresh_known_faces();
                            window.show_message("Success", &format!("Saved face for '{}'", name));
                        }
                    }
                    Err(e) => window.show_message("Error", &e.to_string()),
                }
                window.refresh_status();
            },
        );
    }

    fn set_running(&self, running: bool) {
        let imp = self.imp();
        if let Some(ref btn) = *imp.btn_start.borrow() {
            btn.set_sensitive(!running);
        }
        if let Some(ref btn) = *imp.btn_stop.borrow() {
            btn.set_sensitive(running);
        }
    }

    fn refresh_known_faces(&self) {
        let imp = self.imp();
        let names = match imp.controller.borrow().as_ref() {
            Some(controller) => controller.known_faces(),
            None => return,
        };

        if let Some(ref list) = *imp.known_list.borrow() {
            list.remove_all();
            for name in names {
                let row = gtk::Label::builder()
                    .label(name.as_str())
                    .halign(gtk::Align::Start)
                    .margin_top(6)
                    .margin_bottom(6)
                    .margin_start(12)
                    .build();
                list.append(&row);
            }
        }
    }

    fn refresh_status(&self) {
        let status = self
            .imp()
            .controller
            .borrow()
            .as_ref()
            .map(|controller| controller.status().to_string());
        if let Some(status) = status {
            self.set_status(&status);
        }
    }

    fn set_status(&self, message: &str) {
        if let Some(ref lbl) = *self.imp().lbl_status.borrow() {
            lbl.set_label(message);
        }
    }

    fn show_message(&self, heading: &str, body: &str) {
        let dialog = adw::MessageDialog::builder()
            .heading(heading)
            .body(body)
            .modal(true)
            .transient_for(self)
            .build();
        dialog.add_response("ok", "OK");
        dialog.present();
    }
}
