use orbis_core::ShotRequest;
use std::fmt;
use std::fmt::Write;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShotId(pub u32);

impl fmt::Display for ShotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A projectile in flight. Shots only live until the next periodic clear.
#[derive(Debug, Clone)]
pub struct ShotRecord {
    pub id: ShotId,
    pub owner: String,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub vx: f64,
    pub vy: f64,
    pub created_at: Instant,
}

impl ShotRecord {
    pub fn new(id: ShotId, req: ShotRequest, created_at: Instant) -> Self {
        Self {
            id,
            owner: req.owner,
            kind: req.kind,
            x: req.x,
            y: req.y,
            rotation: req.rotation,
            vx: req.vx,
            vy: req.vy,
            created_at,
        }
    }

    /// Append this shot's `/~key:value~...~/` block to a broadcast.
    pub fn write_block(&self, out: &mut String, now: Instant) {
        let elapsed = now.saturating_duration_since(self.created_at).as_secs_f64();
        // writing into a String cannot fail
        let _ = write!(
            out,
            "/~uniname:{}~user:{}~shot:{}~xcor:{}~ycor:{}~rotat:{}~xvshot:{}~yvshot:{}~timeshot:{:.2}~/",
            self.id, self.owner, self.kind, self.x, self.y, self.rotation, self.vx, self.vy, elapsed
        );
    }
}
