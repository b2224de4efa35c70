use crate::camera_session::main::CameraSession;
use crate::library::logger::interface::Logger;
use crate::library::observers::SubscriptionId;
use crate::viewer::frame_slot::FrameSlot;
use crate::viewer::interface::Viewer;
use eframe::egui;
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

struct ViewerWindow {
    session: Arc<CameraSession>,
    slot: Arc<Mutex<FrameSlot>>,
    subscription: SubscriptionId,
    texture: Option<egui::TextureHandle>,
    device_label: String,
    frame_label: String,
}

impl ViewerWindow {
    fn upload_fresh_frame(&mut self, ctx: &egui::Context) {
        let fresh = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take_fresh();
        let Some(frame) = fresh else {
            return;
        };

        let image = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width as usize, frame.height as usize],
            &frame.to_rgba(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("camera-frame", image, egui::TextureOptions::LINEAR))
            }
        }
        self.frame_label = format!(
            "#{}  {}x{}  {:?}",
            frame.image_number, frame.width, frame.height, frame.pixel_format
        );
    }

    fn controls(&self, ui: &mut egui::Ui) {
        let state = self.session.state();
        let open = state.is_open();

        ui.horizontal(|ui| {
            if ui.add_enabled(!open, egui::Button::new("Open")).clicked() {
                let _ = self.session.open();
            }
            if ui.add_enabled(open, egui::Button::new("Close")).clicked() {
                let _ = self.session.close();
            }
            ui.separator();
            if ui.add_enabled(open, egui::Button::new("Grab Once")).clicked() {
                let _ = self.session.start_single_shot();
            }
            if ui.add_enabled(open, egui::Button::new("Grab")).clicked() {
                let _ = self.session.start_continuous();
            }
            if ui
                .add_enabled(self.session.is_grabbing(), egui::Button::new("Stop"))
                .clicked()
            {
                let _ = self.session.stop();
            }
        });
    }
}

impl eframe::App for ViewerWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.upload_fresh_frame(ctx);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.controls(ui));

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.device_label);
                ui.separator();
                ui.label(format!("{:?}", self.session.state()));
                ui.separator();
                ui.label(&self.frame_label);
                if let Some(status) = self.session.status() {
                    ui.separator();
                    ui.colored_label(egui::Color32::from_rgb(220, 80, 80), status);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| match &self.texture {
            Some(texture) => {
                ui.centered_and_justified(|ui| {
                    ui.add(egui::Image::new(texture).shrink_to_fit());
                });
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label("No frame yet");
                });
            }
        });

        // State changes such as a lost connection arrive without a frame.
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

impl Drop for ViewerWindow {
    fn drop(&mut self) {
        self.session.unsubscribe(self.subscription);
    }
}

pub struct ViewerGui {
    session: Arc<CameraSession>,
    logger: Arc<dyn Logger + Send + Sync>,
    title: String,
    window_size: [f32; 2],
}

impl ViewerGui {
    pub fn new(
        session: Arc<CameraSession>,
        logger: Arc<dyn Logger + Send + Sync>,
        title: String,
        window_size: [f32; 2],
    ) -> Self {
        Self {
            session,
            logger: logger.with_namespace("viewer").with_namespace("gui"),
            title,
            window_size,
        }
    }
}

impl Viewer for ViewerGui {
    fn run(self: Box<Self>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(self.window_size)
                .with_title(self.title.clone()),
            ..Default::default()
        };

        self.logger.info("Opening viewer window")?;

        let session = self.session.clone();
        eframe::run_native(
            &self.title,
            options,
            Box::new(move |cc| {
                let slot = Arc::new(Mutex::new(FrameSlot::default()));
                let ctx = cc.egui_ctx.clone();
                let subscriber_slot = slot.clone();

                // Runs on the SDK thread; the UI thread picks the frame up on repaint.
                let subscription = session.subscribe(move |frame| {
                    let previous = subscriber_slot
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .store(frame);
                    drop(previous);
                    ctx.request_repaint();
                });

                let info = session.device_info();
                let device_label = format!(
                    "{} ({}), {} camera(s) attached",
                    info.model_name,
                    info.serial_number,
                    session.camera_count()
                );
                Box::new(ViewerWindow {
                    device_label,
                    session,
                    slot,
                    subscription,
                    texture: None,
                    frame_label: String::new(),
                })
            }),
        )
        .map_err(|e| e.to_string())?;

        self.logger.info("Viewer window closed")?;
        Ok(())
    }
}
