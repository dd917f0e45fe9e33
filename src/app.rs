use crate::export;
use crate::geometry::{ScrollOffset, ViewportPoint};
use crate::input::GesturePhase;
use crate::model::{Tool, TEXT_SIZE_MULTIPLIER};
use crate::render::SurfaceSpec;
use crate::scheduler::{Clock, Debounce, MonotonicClock, RESIZE_DEBOUNCE};
use crate::session::OverlaySession;
use crate::settings::OverlaySettings;
use crate::settings_store;
use ab_glyph::FontArc;
use eframe::egui;
use tracing::{info, warn};

const PAGE_WIDTH: u32 = 960;
const PAGE_HEIGHT: u32 = 3200;

/// Demo host: a synthetic scrollable page with the annotation overlay on
/// top. Plays the role of the embedding page and its toolbar UI; all ink
/// behavior lives in [`OverlaySession`].
pub struct OverlayApp {
    session: OverlaySession,
    settings: OverlaySettings,
    clock: MonotonicClock,
    scroll_y: f32,
    page_image: image::RgbaImage,
    page_texture: Option<egui::TextureHandle>,
    overlay_texture: Option<egui::TextureHandle>,
    resize_debounce: Debounce,
    pending_surface: Option<SurfaceSpec>,
    auto_attached: bool,
    text_draft: String,
    status: Option<String>,
}

impl OverlayApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: OverlaySettings) -> Self {
        let mut session = OverlaySession::new();
        session.set_history_capacity(settings.history_capacity);
        session.set_tool(settings.last_tool);
        session.set_color(settings.last_color);
        session.set_size(settings.last_size);

        if let Some(font) = load_overlay_font() {
            session.set_font(font);
        } else {
            warn!("no glyph font available; text annotations will not render");
        }

        Self {
            session,
            settings,
            clock: MonotonicClock::new(),
            scroll_y: 0.0,
            page_image: synthetic_page(),
            page_texture: None,
            overlay_texture: None,
            resize_debounce: Debounce::new(RESIZE_DEBOUNCE),
            pending_surface: None,
            auto_attached: false,
            text_draft: String::new(),
            status: None,
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for (tool, label) in [
                (Tool::Pen, "Pen"),
                (Tool::Highlighter, "Highlighter"),
                (Tool::Eraser, "Eraser"),
                (Tool::Text, "Text"),
                (Tool::Line, "Line"),
                (Tool::Arrow, "Arrow"),
                (Tool::Rectangle, "Rect"),
                (Tool::Ellipse, "Ellipse"),
            ] {
                if ui
                    .selectable_label(self.session.tool() == tool, label)
                    .clicked()
                {
                    self.session.set_tool(tool);
                    self.settings.last_tool = tool;
                }
            }

            ui.separator();
            for color in self.settings.palette.clone() {
                let rgb = egui::Color32::from_rgb(color.r, color.g, color.b);
                let selected = self.session.color() == color;
                let (rect, response) =
                    ui.allocate_exact_size(egui::vec2(18.0, 18.0), egui::Sense::click());
                ui.painter().rect_filled(rect, 3.0, rgb);
                if selected {
                    ui.painter()
                        .rect_stroke(rect, 3.0, egui::Stroke::new(2.0, egui::Color32::WHITE));
                }
                if response.clicked() {
                    self.session.set_color(color);
                    self.settings.last_color = color;
                }
            }

            ui.separator();
            let mut size = self.session.width();
            if ui
                .add(egui::Slider::new(&mut size, 1.0..=50.0).text("size"))
                .changed()
            {
                self.session.set_size(size);
                self.settings.last_size = size;
            }

            ui.separator();
            if ui.button("Undo").clicked() {
                self.session.undo();
            }
            if ui.button("Redo").clicked() {
                self.session.redo();
            }
            if ui.button("Clear").clicked() {
                self.session.clear();
            }
            if ui.button("Export").clicked() {
                self.export();
            }

            let attached = self.session.is_attached();
            if ui
                .selectable_label(attached, if attached { "Overlay on" } else { "Overlay off" })
                .clicked()
            {
                if attached {
                    self.session.detach();
                    self.overlay_texture = None;
                } else {
                    let surface = self
                        .pending_surface
                        .unwrap_or_else(|| SurfaceSpec::new(PAGE_WIDTH, 600, 1.0));
                    self.session.attach(surface);
                }
            }

            if let Some(status) = &self.status {
                ui.separator();
                ui.label(status.clone());
            }
        });
    }

    /// Single-key shortcuts from the persisted keybinding map. Plain keys
    /// only; anything with a command or alt modifier is left to the OS/egui.
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let keys = self.settings.keybindings.clone();
        ctx.input(|i| {
            if i.modifiers.command || i.modifiers.alt {
                return;
            }
            for (binding, tool) in [
                (&keys.pen, Tool::Pen),
                (&keys.highlighter, Tool::Highlighter),
                (&keys.eraser, Tool::Eraser),
                (&keys.text, Tool::Text),
                (&keys.line, Tool::Line),
                (&keys.arrow, Tool::Arrow),
                (&keys.rectangle, Tool::Rectangle),
                (&keys.circle, Tool::Ellipse),
            ] {
                if binding_pressed(i, binding) {
                    self.session.set_tool(tool);
                    self.settings.last_tool = tool;
                }
            }
            if binding_pressed(i, &keys.undo) {
                self.session.undo();
            }
            if binding_pressed(i, &keys.redo) {
                self.session.redo();
            }
            if binding_pressed(i, &keys.clear) {
                self.session.clear();
            }
            if binding_pressed(i, &keys.export) {
                self.export();
            }
        });
    }

    fn export(&mut self) {
        let scroll = self.session.scroll();
        let surface = self.session.surface();
        let background = visible_crop(&self.page_image, scroll, surface);
        let result = export::export_canvas(
            self.session.canvas(),
            scroll,
            surface,
            self.session.font(),
            background.as_ref(),
            self.settings.export_background,
        );
        self.status = Some(match result {
            Ok(path) => {
                info!(path = %path.display(), "exported annotated view");
                format!("Saved {}", path.display())
            }
            Err(err) => format!("Export failed: {err:#}"),
        });
    }

    fn text_entry_window(&mut self, ctx: &egui::Context) {
        if self.session.phase() != GesturePhase::EditingText {
            return;
        }
        let Some(anchor) = self.session.text_anchor() else {
            return;
        };
        egui::Window::new("Add text")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.text_edit_singleline(&mut self.text_draft);
                ui.horizontal(|ui| {
                    if ui.button("Add").clicked() {
                        let color = self.session.color();
                        let font_size = self.session.width() * TEXT_SIZE_MULTIPLIER;
                        let text = std::mem::take(&mut self.text_draft);
                        self.session.commit_text(anchor, &text, color, font_size);
                    }
                    if ui.button("Cancel").clicked() {
                        self.text_draft.clear();
                        self.session.cancel_text();
                    }
                });
            });
    }

    fn page_canvas(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let view_rect = ui.available_rect_before_wrap();
        let view_size = view_rect.size();

        // Surface follows the visible viewport; resizes settle through the
        // debounce before the overlay buffer is rebuilt.
        let surface = SurfaceSpec::from_viewport(view_size.x, view_size.y, 1.0);
        if !self.auto_attached {
            self.session.attach(surface);
            self.auto_attached = true;
        } else if self.session.is_attached() && self.pending_surface != Some(surface) {
            self.pending_surface = Some(surface);
            self.resize_debounce.poke(self.clock.now());
        }
        if self.resize_debounce.fire(self.clock.now()) {
            if let Some(pending) = self.pending_surface {
                self.session.resize_surface(pending);
            }
        }

        // Wheel scrolls the page under the overlay.
        let wheel = ctx.input(|i| i.smooth_scroll_delta.y);
        if wheel != 0.0 {
            let max_scroll = (PAGE_HEIGHT as f32 - view_size.y).max(0.0);
            self.scroll_y = (self.scroll_y - wheel).clamp(0.0, max_scroll);
            self.session.set_scroll(ScrollOffset::new(0.0, self.scroll_y));
        }

        let painter = ui.painter_at(view_rect);
        let page_texture = self.page_texture.get_or_insert_with(|| {
            ctx.load_texture(
                "page",
                egui::ColorImage::from_rgba_unmultiplied(
                    [PAGE_WIDTH as usize, PAGE_HEIGHT as usize],
                    self.page_image.as_raw(),
                ),
                egui::TextureOptions::LINEAR,
            )
        });
        painter.image(
            page_texture.id(),
            egui::Rect::from_min_size(
                view_rect.min - egui::vec2(0.0, self.scroll_y),
                egui::vec2(PAGE_WIDTH as f32, PAGE_HEIGHT as f32),
            ),
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        // Pointer lifecycle over the page area.
        let response = ui.interact(
            view_rect,
            ui.id().with("overlay-canvas"),
            egui::Sense::click_and_drag(),
        );
        let pointer = response
            .interact_pointer_pos()
            .map(|pos| ViewportPoint::new(pos.x - view_rect.min.x, pos.y - view_rect.min.y));

        if self.session.tool() == Tool::Text {
            if response.clicked() {
                if let Some(point) = pointer {
                    self.session.begin_gesture(point);
                }
            }
        } else if response.drag_started() {
            if let Some(point) = pointer {
                self.session.begin_gesture(point);
            }
        } else if response.dragged() {
            if let Some(point) = pointer {
                self.session.extend_gesture(point, self.clock.now());
            }
        } else if response.drag_stopped() {
            self.session.end_gesture();
        } else if self.session.phase() == GesturePhase::Dragging
            && !ctx.input(|i| i.pointer.has_pointer())
        {
            self.session.pointer_left();
        }

        // Repaint the overlay when the scheduler grants one.
        if self.session.tick(self.clock.now()) {
            let surface = self.session.surface();
            let pixels = self
                .session
                .render_frame(ScrollOffset::new(0.0, self.scroll_y));
            let overlay = egui::ColorImage::from_rgba_unmultiplied(
                [surface.width as usize, surface.height as usize],
                &pixels,
            );
            match &mut self.overlay_texture {
                Some(texture) => texture.set(overlay, egui::TextureOptions::LINEAR),
                None => {
                    self.overlay_texture =
                        Some(ctx.load_texture("overlay", overlay, egui::TextureOptions::LINEAR));
                }
            }
        }
        if let Some(texture) = self.overlay_texture.as_ref().filter(|_| self.session.is_attached()) {
            painter.image(
                texture.id(),
                egui::Rect::from_min_size(view_rect.min, view_size),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        if self.session.repaint_pending() {
            ctx.request_repaint_after(std::time::Duration::from_millis(8));
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.page_canvas(ctx, ui));
        self.text_entry_window(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(err) = settings_store::save(&self.settings) {
            warn!(error = %format!("{err:#}"), "failed to persist overlay settings");
        }
    }
}

fn binding_pressed(input: &egui::InputState, binding: &str) -> bool {
    binding_key(binding).is_some_and(|key| input.key_pressed(key))
}

/// Resolves a stored single-character binding to an egui key. Empty or
/// unrecognized bindings resolve to nothing.
fn binding_key(binding: &str) -> Option<egui::Key> {
    let name = binding.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }
    egui::Key::from_name(&name)
}

/// Pulls a TTF out of egui's bundled fonts for the glyph rasterizer.
fn load_overlay_font() -> Option<FontArc> {
    let definitions = egui::FontDefinitions::default();
    let data = definitions
        .font_data
        .get("Ubuntu-Light")
        .or_else(|| definitions.font_data.values().next())?;
    FontArc::try_from_vec(data.font.to_vec()).ok()
}

/// A fake article: white page with gray paragraph bars, tall enough that
/// scroll-anchoring is obvious.
fn synthetic_page() -> image::RgbaImage {
    let mut page = image::RgbaImage::from_pixel(
        PAGE_WIDTH,
        PAGE_HEIGHT,
        image::Rgba([250, 250, 248, 255]),
    );
    let bar = image::Rgba([210, 212, 216, 255]);
    let mut y = 60u32;
    let mut line = 0u32;
    while y + 14 < PAGE_HEIGHT {
        // Paragraphs of five lines with ragged right edges.
        let width = PAGE_WIDTH - 160 - (line % 5) * 90;
        for yy in y..y + 14 {
            for xx in 80..80 + width {
                page.put_pixel(xx, yy, bar);
            }
        }
        line += 1;
        y += if line % 5 == 0 { 54 } else { 26 };
    }
    page
}


fn visible_crop(
    page: &image::RgbaImage,
    scroll: ScrollOffset,
    surface: SurfaceSpec,
) -> Option<image::RgbaImage> {
    let x = scroll.x.max(0.0) as u32;
    let y = scroll.y.max(0.0) as u32;
    if x + surface.width > page.width() || y + surface.height > page.height() {
        return None;
    }
    Some(image::imageops::crop_imm(page, x, y, surface.width, surface.height).to_image())
}
