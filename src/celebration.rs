use rand::seq::SliceRandom;
use rand::Rng;
use std::time::SystemTime;

/// One confetti particle. `color_index` selects from the palette the UI maps
/// to terminal colors.
#[derive(Debug, Clone)]
pub struct ConfettiParticle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
}

impl ConfettiParticle {
    fn new(x: f64, y: f64) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            x,
            y,
            vel_x: rng.gen_range(-2.0..2.0),
            vel_y: rng.gen_range(2.0..6.0),
            symbol: *['●', '◆', '▪', '✦'].choose(&mut rng).unwrap_or(&'●'),
            color_index: rng.gen_range(0..4),
        }
    }

    /// Advance one step. Returns false once the particle leaves the area.
    fn update(&mut self, dt: f64, height: f64) -> bool {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.y < height
    }
}

/// Confetti burst fired on a correct answer: particles rain from the top of
/// the area until they fall out or the burst times out.
#[derive(Debug)]
pub struct ConfettiBurst {
    pub particles: Vec<ConfettiParticle>,
    pub started_at: SystemTime,
    pub duration_secs: f64,
    pub is_active: bool,
    pub area_width: f64,
    pub area_height: f64,
}

impl ConfettiBurst {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            started_at: SystemTime::now(),
            duration_secs: 2.5,
            is_active: false,
            area_width: 80.0,
            area_height: 24.0,
        }
    }

    pub fn start(&mut self, width: u16, height: u16) {
        let mut rng = rand::thread_rng();
        self.particles.clear();
        self.started_at = SystemTime::now();
        self.is_active = true;
        self.area_width = width as f64;
        self.area_height = height as f64;

        for _ in 0..40 {
            let x = rng.gen_range(0.0..self.area_width);
            let y = rng.gen_range(0.0..3.0);
            self.particles.push(ConfettiParticle::new(x, y));
        }
    }

    pub fn update(&mut self) {
        if !self.is_active {
            return;
        }
        let elapsed = self.started_at.elapsed().unwrap_or_default().as_secs_f64();
        if elapsed >= self.duration_secs {
            self.is_active = false;
            self.particles.clear();
            return;
        }
        let dt = 0.1;
        let height = self.area_height;
        self.particles.retain_mut(|particle| particle.update(dt, height));
        if self.particles.is_empty() {
            self.is_active = false;
        }
    }
}

impl Default for ConfettiBurst {
    fn default() -> Self {
        Self::new()
    }
}
