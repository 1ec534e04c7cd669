use crate::app::views::View;
use crate::common::BoundingBox;
use crate::pipeline::{PanelSnapshot, Preview};
use egui::{Color32, Pos2, Rect, RichText, Stroke, TextureHandle, TextureOptions};

const ROI_COLOR: Color32 = Color32::from_rgb(0, 200, 0);
const OK_COLOR: Color32 = Color32::from_rgb(0, 170, 0);
const NOT_OK_COLOR: Color32 = Color32::from_rgb(220, 0, 0);

/// Live camera image with the ROI outline and the feedback panel on top.
pub struct PreviewView {
    texture: Option<TextureHandle>,
    current: Option<Preview>,
    dirty: bool,
}

impl PreviewView {
    pub fn new() -> Self {
        Self {
            texture: None,
            current: None,
            dirty: false,
        }
    }

    pub fn set_preview(&mut self, preview: Preview) {
        self.current = Some(preview);
        self.dirty = true;
    }

    pub fn current(&self) -> Option<&Preview> {
        self.current.as_ref()
    }

    fn upload(&mut self, ui: &egui::Ui) {
        let Some(preview) = &self.current else {
            return;
        };
        if !self.dirty && self.texture.is_some() {
            return;
        }
        let image = preview.frame.image();
        let color_image = egui::ColorImage::from_rgb(
            [image.width() as usize, image.height() as usize],
            image.as_raw().as_slice(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(color_image, TextureOptions::default()),
            None => {
                self.texture = Some(ui.ctx().load_texture(
                    "camera_frame",
                    color_image,
                    TextureOptions::default(),
                ))
            }
        }
        self.dirty = false;
    }

    fn draw_roi(ui: &egui::Ui, image_rect: Rect, frame_width: u32, roi: BoundingBox) {
        let scale = image_rect.width() / frame_width.max(1) as f32;
        let min = image_rect.min + egui::vec2(roi.x as f32 * scale, roi.y as f32 * scale);
        let max = min + egui::vec2(roi.width as f32 * scale, roi.height as f32 * scale);
        let stroke = Stroke::new(2.0, ROI_COLOR);
        let corners = [
            min,
            Pos2::new(max.x, min.y),
            max,
            Pos2::new(min.x, max.y),
        ];
        let painter = ui.painter();
        for i in 0..corners.len() {
            painter.line_segment([corners[i], corners[(i + 1) % corners.len()]], stroke);
        }
    }

    fn draw_panel(ui: &mut egui::Ui, panel: &PanelSnapshot) {
        let border = if panel.ok { OK_COLOR } else { NOT_OK_COLOR };
        egui::Frame::default()
            .fill(Color32::WHITE)
            .stroke(Stroke::new(3.0, border))
            .inner_margin(egui::Margin::same(10))
            .show(ui, |ui| {
                for line in &panel.lines {
                    ui.label(RichText::new(line).color(Color32::BLACK).size(22.0).strong());
                }
            });
    }
}

impl Default for PreviewView {
    fn default() -> Self {
        Self::new()
    }
}

impl View for PreviewView {
    fn draw(&mut self, ui: &mut egui::Ui) {
        self.upload(ui);
        let (Some(texture), Some(preview)) = (&self.texture, &self.current) else {
            ui.heading("Waiting for camera...");
            return;
        };

        let response = ui.image(texture);
        if let Some(roi) = preview.roi {
            Self::draw_roi(ui, response.rect, preview.frame.size().width, roi);
        }

        if let Some(panel) = &preview.panel {
            let mut panel_ui = ui.new_child(
                egui::UiBuilder::new().max_rect(response.rect.shrink(20.0)),
            );
            Self::draw_panel(&mut panel_ui, panel);
        }
    }
}
