mod routing;
mod scenario;
