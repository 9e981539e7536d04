// egui heads-up display: title card, hints, knife sidebar, cut progress,
// reveal message with floating emoji, and the F3 stats panel.

use egui::epaint::Shadow;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::engine::tween::Millis;

use super::ui::{CursorHint, UiState};

const HEART_EMOJI: [&str; 9] = ["💕", "💖", "💗", "💘", "❤️", "🌹", "✨", "🦪", "🐕"];
const HEART_BURST: usize = 15;
const HEART_BURST_SPACING_MS: Millis = 100.0;
const HEART_TRICKLE_MS: Millis = 400.0;

const ACCENT: egui::Color32 = egui::Color32::from_rgb(0xe8, 0x58, 0x7a);
const PANEL_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);

/// Buttons the player pressed this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudAction {
    Start,
    SelectKnife,
}

pub struct DebugStats {
    pub fps: u32,
    pub frame_time_ms: f32,
    pub phase: &'static str,
    pub zoom: f32,
    pub entity_count: usize,
    pub running_sequences: usize,
    pub pending_timers: usize,
    pub screws_removed: usize,
    pub cut_percent: f32,
}

/// What the HUD shows this frame.
pub struct HudFrame<'a> {
    pub ui: &'a UiState,
    pub show_cut_progress: bool,
    /// The reveal phase is active; hearts keep coming while the message is up.
    pub revealing: bool,
    pub now: Millis,
    pub stats: Option<&'a DebugStats>,
}

// ============================================================================
// FLOATING HEARTS
// ============================================================================

#[derive(Debug, Clone)]
pub struct FloatingHeart {
    pub emoji: &'static str,
    /// Horizontal position as a fraction of screen width.
    pub x: f32,
    pub size: f32,
    pub born: Millis,
    pub duration: Millis,
}

impl FloatingHeart {
    pub fn progress(&self, now: Millis) -> f32 {
        ((now - self.born) / self.duration).clamp(0.0, 1.0) as f32
    }
}

/// Emoji rising up the screen behind the reveal message.
#[derive(Debug, Default)]
pub struct FloatingHearts {
    hearts: Vec<FloatingHeart>,
    spawned: usize,
    next_spawn: Option<Millis>,
}

impl FloatingHearts {
    /// A quick burst, then a steady trickle for as long as `active` holds.
    pub fn update(&mut self, now: Millis, active: bool, rng: &mut impl Rng) {
        self.hearts.retain(|h| now - h.born < h.duration);
        if !active {
            return;
        }
        let mut next = *self.next_spawn.get_or_insert(now);
        // After a stall, resume the cadence from now instead of spraying the backlog
        if now - next > HEART_TRICKLE_MS * 2.0 {
            next = now;
        }
        while next <= now {
            self.hearts.push(FloatingHeart {
                emoji: HEART_EMOJI[rng.gen_range(0..HEART_EMOJI.len())],
                x: rng.gen_range(0.0..1.0),
                size: rng.gen_range(16.0..40.0),
                born: now,
                duration: rng.gen_range(3000.0..7000.0),
            });
            self.spawned += 1;
            next += if self.spawned < HEART_BURST {
                HEART_BURST_SPACING_MS
            } else {
                HEART_TRICKLE_MS
            };
        }
        self.next_spawn = Some(next);
    }

    pub fn hearts(&self) -> &[FloatingHeart] {
        &self.hearts
    }

    #[cfg(test)]
    pub fn spawned(&self) -> usize {
        self.spawned
    }
}

pub fn cursor_icon(hint: CursorHint) -> egui::CursorIcon {
    match hint {
        CursorHint::Default => egui::CursorIcon::Default,
        CursorHint::Pointer => egui::CursorIcon::PointingHand,
        CursorHint::Grab => egui::CursorIcon::Grab,
        CursorHint::Grabbing => egui::CursorIcon::Grabbing,
        CursorHint::Copy => egui::CursorIcon::Copy,
        CursorHint::Hidden => egui::CursorIcon::None,
    }
}

// ============================================================================
// HUD
// ============================================================================

pub struct Hud {
    pub stats_visible: bool,
    hearts: FloatingHearts,
    rng: StdRng,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Hud {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        stats_visible: bool,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = PANEL_FILL;
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        visuals.selection.bg_fill = ACCENT;
        egui_ctx.set_visuals(visuals);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            stats_visible,
            hearts: FloatingHearts::default(),
            rng: StdRng::from_entropy(),
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.stats_visible = !self.stats_visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Draw one HUD frame over the already-rendered scene.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        frame: &HudFrame,
    ) -> Vec<HudAction> {
        let ui_state = frame.ui;
        self.hearts
            .update(frame.now, ui_state.overlay_visible && frame.revealing, &mut self.rng);

        let mut actions = Vec::new();
        let raw_input = self.egui_state.take_egui_input(window);
        let hearts = self.hearts.hearts();
        let stats = if self.stats_visible { frame.stats } else { None };

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ctx.set_cursor_icon(cursor_icon(ui_state.cursor));

            if !ui_state.started {
                title_card(ctx, &mut actions);
                return;
            }
            if let Some(hint) = ui_state.hint {
                let offset = egui::vec2(0.0, -24.0);
                banner(ctx, "hint", egui::Align2::CENTER_BOTTOM, offset, hint.text());
            }
            if ui_state.sidebar_visible {
                knife_sidebar(ctx, ui_state.knife_selected, &mut actions);
            }
            if frame.show_cut_progress {
                cut_progress(ctx, ui_state.cut_progress_percent);
            }
            if ui_state.overlay_visible {
                floating_hearts(ctx, hearts, frame.now);
                reveal_message(ctx);
            }
            if let Some(stats) = stats {
                stats_panel(ctx, stats);
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hud pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        actions
    }
}

// ----------------------------------------------------------------------------
// Widgets
// ----------------------------------------------------------------------------

fn panel() -> egui::Frame {
    egui::Frame::none()
        .fill(PANEL_FILL)
        .inner_margin(egui::Margin::same(12.0))
        .rounding(8.0)
}

fn title_card(ctx: &egui::Context, actions: &mut Vec<HudAction>) {
    egui::Area::new(egui::Id::new("title"))
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            panel().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    let title = egui::RichText::new("🦪 Valentine Oyster 🐕");
                    ui.label(title.size(32.0).color(ACCENT));
                    ui.add_space(6.0);
                    ui.label("Shuck an oyster for a very good dog.");
                    ui.add_space(12.0);
                    if ui.button(egui::RichText::new("  Start  ").size(20.0)).clicked() {
                        actions.push(HudAction::Start);
                    }
                });
            });
        });
}

fn banner(ctx: &egui::Context, id: &str, anchor: egui::Align2, offset: egui::Vec2, text: &str) {
    egui::Area::new(egui::Id::new(id))
        .anchor(anchor, offset)
        .interactable(false)
        .show(ctx, |ui| {
            panel().show(ui, |ui| {
                ui.label(egui::RichText::new(text).size(17.0));
            });
        });
}

fn knife_sidebar(ctx: &egui::Context, selected: bool, actions: &mut Vec<HudAction>) {
    egui::Area::new(egui::Id::new("sidebar"))
        .anchor(egui::Align2::RIGHT_CENTER, egui::vec2(-16.0, 0.0))
        .show(ctx, |ui| {
            panel().show(ui, |ui| {
                ui.label("Tools");
                let label = egui::RichText::new("🔪 Oyster knife").size(18.0);
                let knife = egui::SelectableLabel::new(selected, label);
                if ui.add(knife).clicked() {
                    actions.push(HudAction::SelectKnife);
                }
            });
        });
}

fn cut_progress(ctx: &egui::Context, percent: f32) {
    egui::Area::new(egui::Id::new("cut_progress"))
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 20.0))
        .interactable(false)
        .show(ctx, |ui| {
            panel().show(ui, |ui| {
                ui.add(
                    egui::ProgressBar::new(percent / 100.0)
                        .desired_width(260.0)
                        .fill(ACCENT)
                        .text(format!("Cutting… {percent:.0}%")),
                );
            });
        });
}

fn reveal_message(ctx: &egui::Context) {
    egui::Area::new(egui::Id::new("reveal"))
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, -80.0))
        .interactable(false)
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let headline = egui::RichText::new("Happy Valentine's Day!");
                ui.label(headline.size(40.0).color(ACCENT).strong());
                let signoff = egui::RichText::new("with love (and a little gas) from the pup");
                ui.label(signoff.size(18.0));
            });
        });
}

fn floating_hearts(ctx: &egui::Context, hearts: &[FloatingHeart], now: Millis) {
    let screen = ctx.screen_rect();
    let layer = egui::LayerId::new(egui::Order::Background, egui::Id::new("hearts"));
    let painter = ctx.layer_painter(layer);
    for heart in hearts {
        let t = heart.progress(now);
        let pos = egui::pos2(
            screen.left() + heart.x * screen.width(),
            screen.bottom() + heart.size - t * (screen.height() + heart.size * 2.0),
        );
        let alpha = ((1.0 - t) * 255.0) as u8;
        painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            heart.emoji,
            egui::FontId::proportional(heart.size),
            egui::Color32::from_white_alpha(alpha),
        );
    }
}

fn stats_panel(ctx: &egui::Context, stats: &DebugStats) {
    egui::Area::new(egui::Id::new("debug_stats"))
        .fixed_pos(egui::pos2(10.0, 10.0))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(PANEL_FILL)
                .inner_margin(egui::Margin::same(8.0))
                .rounding(4.0)
                .show(ui, |ui: &mut egui::Ui| {
                    let mono = |s: String| egui::RichText::new(s).monospace().size(13.0);
                    ui.label(mono(format!("FPS: {}  ({:.2} ms)", stats.fps, stats.frame_time_ms)));
                    ui.label(mono(format!("Phase: {}", stats.phase)));
                    ui.label(mono(format!("Zoom: {:.0}%", stats.zoom * 100.0)));
                    ui.label(mono(format!(
                        "Entities: {}  Sequences: {}  Timers: {}",
                        stats.entity_count, stats.running_sequences, stats.pending_timers
                    )));
                    ui.label(mono(format!(
                        "Screws: {}  Cut: {:.0}%",
                        stats.screws_removed, stats.cut_percent
                    )));
                });
        });
}
