// Two tiers:
// Public (no auth): service info, health, register, login
// Protected (JWT + validated user): everything else under /api
pub mod protected;
pub mod public;
