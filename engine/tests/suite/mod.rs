mod dispatch;
mod driver;
